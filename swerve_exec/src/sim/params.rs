//! Parameters for the drivetrain simulation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::drive_params::{check_non_negative, check_positive, ConfigError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    pub battery: BatteryParams,

    pub drive_motor: MotorParams,

    pub steer_motor: MotorParams,

    // ---- MODULES ----

    /// Ratio of drive motor revolutions to wheel revolutions.
    pub drive_reduction: f64,

    /// Ratio of steer motor revolutions to module revolutions.
    pub steer_reduction: f64,

    /// Moment of inertia of a module about its steer axis.
    ///
    /// Units: kilogram meters squared
    pub steer_moi_kgm2: f64,

    /// Proportional gain of the steer position controller.
    ///
    /// Units: volts/radian
    pub steer_k_p: f64,

    /// Voltage corresponding to full speed in drive and steer commands.
    ///
    /// Units: volts
    pub max_command_voltage_v: f64,

    // ---- GROUND CONTACT ----

    /// Coefficient of friction between the wheels and the floor.
    pub wheel_friction_coeff: f64,

    /// Force resisting sideways sliding of a wheel, per unit sideways speed.
    ///
    /// Units: newtons/(meter/second)
    pub lateral_damping_nspm: f64,
}

/// Parameters of the battery and wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryParams {
    /// Open circuit voltage of a charged battery.
    ///
    /// Units: volts
    pub nominal_voltage_v: f64,

    /// Internal resistance of the battery plus the wiring.
    ///
    /// Units: ohms
    pub internal_resistance_ohm: f64,

    /// Current drawn by everything other than the motors.
    ///
    /// Units: amps
    pub quiescent_current_a: f64,

    /// Terminal voltage below which the robot is browned out.
    ///
    /// Units: volts
    pub brownout_threshold_v: f64,
}

/// Datasheet parameters of a brushed or brushless DC motor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorParams {
    /// Voltage at which the other values are specified.
    ///
    /// Units: volts
    pub nominal_voltage_v: f64,

    /// Units: newton meters
    pub stall_torque_nm: f64,

    /// Units: amps
    pub stall_current_a: f64,

    /// Units: radians/second
    pub free_speed_rads: f64,

    /// Units: amps
    pub free_current_a: f64,

    /// Limit on the motor current set in the motor controller.
    ///
    /// Units: amps
    pub current_limit_a: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            battery: BatteryParams::default(),
            drive_motor: MotorParams {
                current_limit_a: Some(80.0),
                ..MotorParams::falcon_500()
            },
            steer_motor: MotorParams::falcon_500(),
            drive_reduction: 6.75,
            steer_reduction: 12.8,
            steer_moi_kgm2: 0.004,
            steer_k_p: 8.0,
            max_command_voltage_v: 12.0,
            wheel_friction_coeff: 1.0,
            lateral_damping_nspm: 5000.0,
        }
    }
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            nominal_voltage_v: 13.2,
            internal_resistance_ohm: 0.040,
            quiescent_current_a: 2.0,
            brownout_threshold_v: 6.5,
        }
    }
}

impl MotorParams {
    /// Falcon 500 (Talon FX) motor.
    pub fn falcon_500() -> Self {
        Self {
            nominal_voltage_v: 12.0,
            stall_torque_nm: 4.69,
            stall_current_a: 257.0,
            free_speed_rads: 6380.0 / 60.0 * std::f64::consts::TAU,
            free_current_a: 1.5,
            current_limit_a: None,
        }
    }

    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        check_positive(name, self.nominal_voltage_v)?;
        check_positive(name, self.stall_torque_nm)?;
        check_positive(name, self.free_speed_rads)?;
        check_non_negative(name, self.free_current_a)?;

        if self.stall_current_a <= self.free_current_a || !self.stall_current_a.is_finite() {
            return Err(ConfigError::Invalid {
                name,
                reason: format!(
                    "stall current ({} A) must exceed free current ({} A)",
                    self.stall_current_a, self.free_current_a
                ),
            });
        }

        if let Some(limit) = self.current_limit_a {
            check_positive(name, limit)?;
        }

        Ok(())
    }
}

impl BatteryParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("battery.nominal_voltage_v", self.nominal_voltage_v)?;
        check_positive("battery.internal_resistance_ohm", self.internal_resistance_ohm)?;
        check_non_negative("battery.quiescent_current_a", self.quiescent_current_a)?;
        check_non_negative("battery.brownout_threshold_v", self.brownout_threshold_v)?;

        Ok(())
    }
}

impl Params {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.battery.validate()?;
        self.drive_motor.validate("drive_motor")?;
        self.steer_motor.validate("steer_motor")?;

        check_positive("drive_reduction", self.drive_reduction)?;
        check_positive("steer_reduction", self.steer_reduction)?;
        check_positive("steer_moi_kgm2", self.steer_moi_kgm2)?;
        check_non_negative("steer_k_p", self.steer_k_p)?;
        check_positive("max_command_voltage_v", self.max_command_voltage_v)?;
        check_positive("wheel_friction_coeff", self.wheel_friction_coeff)?;
        check_non_negative("lateral_damping_nspm", self.lateral_damping_nspm)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_battery() {
        let mut p = Params::default();
        p.battery.internal_resistance_ohm = 0.0;
        assert_eq!(
            p.validate(),
            Err(ConfigError::NonPositive {
                name: "battery.internal_resistance_ohm",
                value: 0.0
            })
        );

        let mut p = Params::default();
        p.battery.nominal_voltage_v = -12.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_invalid_motor() {
        let mut p = Params::default();
        p.drive_motor.stall_current_a = 1.0;
        assert!(matches!(p.validate(), Err(ConfigError::Invalid { name: "drive_motor", .. })));
    }
}
