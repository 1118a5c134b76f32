//! Actuator interfaces and the swerve module built on them
//!
//! The rest of the software only talks to a module through these traits, so
//! the simulated actuators below and any hardware actuators are
//! interchangeable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::kinematics::ModuleState;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An actuator which drives a wheel.
pub trait DriveController {
    /// Set the voltage to apply to the drive motor.
    fn set_reference_voltage(&mut self, voltage_v: f64);

    /// Linear speed of the wheel contact point.
    ///
    /// Units: meters/second
    fn get_state_velocity(&self) -> f64;
}

/// An actuator which holds a module at an angle.
pub trait SteerController {
    /// Set the module angle to steer to.
    fn set_reference_angle(&mut self, angle_rad: f64);

    /// Present module angle.
    ///
    /// Units: radians
    fn get_state_angle(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Conversion from module speed commands to drive voltages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleConfig {
    /// Drive voltage needed per unit of wheel speed.
    ///
    /// Units: volts/(meter/second)
    pub drive_volts_per_ms: f64,

    /// Largest drive voltage ever commanded.
    ///
    /// Units: volts
    pub max_voltage_v: f64,
}

/// A swerve module made of one drive and one steer actuator.
#[derive(Debug, Clone)]
pub struct SwerveModule<D, S> {
    drive: D,
    steer: S,
    config: ModuleConfig,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<D, S> SwerveModule<D, S>
where
    D: DriveController,
    S: SteerController,
{
    pub fn new(drive: D, steer: S, config: ModuleConfig) -> Self {
        Self {
            drive,
            steer,
            config,
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }

    pub fn steer(&self) -> &S {
        &self.steer
    }

    pub fn steer_mut(&mut self) -> &mut S {
        &mut self.steer
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Command the drive voltage and the steer angle directly.
    pub fn set(&mut self, drive_voltage_v: f64, steer_angle_rad: f64) {
        self.drive.set_reference_voltage(drive_voltage_v);
        self.steer.set_reference_angle(steer_angle_rad);
    }

    /// Command a module state.
    ///
    /// The module steers the shortest way to the state's angle, reversing
    /// the drive if that is the opposite direction.
    pub fn set_state(&mut self, state: &ModuleState) {
        let (speed_ms, angle_rad) = state.optimise(self.steer.get_state_angle());

        let voltage_v = (speed_ms * self.config.drive_volts_per_ms)
            .clamp(-self.config.max_voltage_v, self.config.max_voltage_v);

        self.set(voltage_v, angle_rad);
    }

    /// The present state of the module as seen by its actuators.
    pub fn get_state(&self) -> ModuleState {
        ModuleState::new(self.drive.get_state_velocity(), self.steer.get_state_angle())
    }
}
