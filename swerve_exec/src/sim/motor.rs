//! DC motor model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::MotorParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Linear DC motor model derived from datasheet values.
///
/// The motor is a resistance in series with a back EMF proportional to
/// speed, producing torque proportional to current.
#[derive(Debug, Clone, Copy)]
pub struct DcMotor {
    /// Winding resistance.
    ///
    /// Units: ohms
    resistance_ohm: f64,

    /// Speed per volt of back EMF.
    ///
    /// Units: radians/second/volt
    kv_radspv: f64,

    /// Torque per amp.
    ///
    /// Units: newton meters/amp
    kt_nmpa: f64,

    /// Units: amps
    current_limit_a: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DcMotor {
    /// Build the model. The parameters must already be validated.
    pub fn new(params: &MotorParams) -> Self {
        let resistance_ohm = params.nominal_voltage_v / params.stall_current_a;

        Self {
            resistance_ohm,
            kv_radspv: params.free_speed_rads
                / (params.nominal_voltage_v - resistance_ohm * params.free_current_a),
            kt_nmpa: params.stall_torque_nm / params.stall_current_a,
            current_limit_a: params.current_limit_a,
        }
    }

    pub fn resistance_ohm(&self) -> f64 {
        self.resistance_ohm
    }

    pub fn kv_radspv(&self) -> f64 {
        self.kv_radspv
    }

    pub fn kt_nmpa(&self) -> f64 {
        self.kt_nmpa
    }

    pub fn current_limit_a(&self) -> Option<f64> {
        self.current_limit_a
    }

    /// Current drawn with `voltage_v` across the motor turning at
    /// `speed_rads`, limited to the current limit.
    ///
    /// Units: amps
    pub fn current_a(&self, voltage_v: f64, speed_rads: f64) -> f64 {
        let current_a = (voltage_v - speed_rads / self.kv_radspv) / self.resistance_ohm;

        match self.current_limit_a {
            Some(limit) => current_a.clamp(-limit, limit),
            None => current_a,
        }
    }

    /// Units: newton meters
    pub fn torque_nm(&self, current_a: f64) -> f64 {
        self.kt_nmpa * current_a
    }

    /// Speed the unloaded motor settles at for the given voltage.
    ///
    /// Units: radians/second
    pub fn free_speed_rads(&self, voltage_v: f64) -> f64 {
        self.kv_radspv * voltage_v
    }

    /// Time constant of the motor driving the given inertia (on the motor
    /// shaft) with no current limit.
    ///
    /// Units: seconds
    pub fn time_constant_s(&self, moi_kgm2: f64) -> f64 {
        moi_kgm2 * self.resistance_ohm * self.kv_radspv / self.kt_nmpa
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_datasheet_points() {
        let params = MotorParams::falcon_500();
        let motor = DcMotor::new(&params);

        // Stalled at nominal voltage
        assert_relative_eq!(motor.current_a(12.0, 0.0), 257.0, epsilon = 1e-9);
        assert_relative_eq!(motor.torque_nm(257.0), 4.69, epsilon = 1e-9);

        // Free running at nominal voltage
        assert_relative_eq!(
            motor.current_a(12.0, params.free_speed_rads),
            1.5,
            epsilon = 1e-9
        );

        // Driven backwards
        assert!(motor.current_a(-12.0, 100.0) < -257.0);
    }

    #[test]
    fn test_current_limit() {
        let params = MotorParams {
            current_limit_a: Some(40.0),
            ..MotorParams::falcon_500()
        };
        let motor = DcMotor::new(&params);

        assert_relative_eq!(motor.current_a(12.0, 0.0), 40.0);
        assert_relative_eq!(motor.current_a(-12.0, 0.0), -40.0);
        assert!(motor.current_a(1.0, 0.0) < 40.0);
    }
}
