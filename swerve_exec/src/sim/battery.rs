//! Battery model and power state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::BatteryParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A battery modelled as an ideal voltage source behind a resistance.
#[derive(Debug, Clone)]
pub struct Battery {
    params: BatteryParams,

    /// Units: volts
    terminal_voltage_v: f64,

    /// Current drawn in the last update, including the quiescent draw.
    ///
    /// Units: amps
    total_current_a: f64,
}

/// Electrical state of the simulated robot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SimPowerState {
    /// Units: volts
    pub open_circuit_v: f64,

    /// Units: ohms
    pub internal_resistance_ohm: f64,

    /// Units: volts
    pub terminal_voltage_v: f64,

    /// True if the last sub-step was browned out.
    pub browned_out: bool,

    /// Current drawn in the last sub-step.
    ///
    /// Units: amps
    pub total_current_a: f64,

    /// Number of sub-steps browned out during the last step.
    pub brownout_substeps: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Battery {
    /// Create a charged battery with no load.
    pub fn new(params: BatteryParams) -> Self {
        let terminal_voltage_v = params.nominal_voltage_v;

        Self {
            params,
            terminal_voltage_v,
            total_current_a: 0.0,
        }
    }

    /// Restore the battery to its nominal unloaded voltage.
    pub fn reset(&mut self) {
        self.terminal_voltage_v = self.params.nominal_voltage_v;
        self.total_current_a = 0.0;
    }

    /// Units: volts
    pub fn terminal_voltage_v(&self) -> f64 {
        self.terminal_voltage_v
    }

    /// Units: amps
    pub fn total_current_a(&self) -> f64 {
        self.total_current_a
    }

    /// Whether the terminal voltage is below the brownout threshold.
    pub fn is_browned_out(&self) -> bool {
        self.terminal_voltage_v < self.params.brownout_threshold_v
    }

    /// Update the terminal voltage for the given load current. The quiescent
    /// draw is added on top.
    pub fn update(&mut self, load_current_a: f64) {
        self.total_current_a = self.params.quiescent_current_a + load_current_a.max(0.0);
        self.terminal_voltage_v = (self.params.nominal_voltage_v
            - self.total_current_a * self.params.internal_resistance_ohm)
            .clamp(0.0, self.params.nominal_voltage_v);
    }

    /// The power state given the number of browned out sub-steps in the step.
    pub fn power_state(&self, browned_out: bool, brownout_substeps: u64) -> SimPowerState {
        SimPowerState {
            open_circuit_v: self.params.nominal_voltage_v,
            internal_resistance_ohm: self.params.internal_resistance_ohm,
            terminal_voltage_v: self.terminal_voltage_v,
            browned_out,
            total_current_a: self.total_current_a,
            brownout_substeps,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quiescent_only() {
        let mut battery = Battery::new(BatteryParams::default());
        assert_relative_eq!(battery.terminal_voltage_v(), 13.2);

        battery.update(0.0);
        assert_relative_eq!(battery.terminal_voltage_v(), 13.12, epsilon = 1e-12);
        assert_relative_eq!(battery.total_current_a(), 2.0);
        assert!(!battery.is_browned_out());
    }

    #[test]
    fn test_heavy_load_browns_out() {
        let mut battery = Battery::new(BatteryParams::default());

        // (13.2 - 6.5) / 0.04 = 167.5 A total puts it right on the threshold,
        // which is not a brownout
        battery.update(165.5);
        assert_relative_eq!(battery.terminal_voltage_v(), 6.5, epsilon = 1e-9);
        battery.update(166.0);
        assert!(battery.is_browned_out());

        // Never negative
        battery.update(1e6);
        assert_relative_eq!(battery.terminal_voltage_v(), 0.0);

        battery.reset();
        assert_relative_eq!(battery.terminal_voltage_v(), 13.2);
    }
}
