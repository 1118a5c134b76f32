//! Simulated drive and steer actuators

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{DcMotor, DriveController, SteerController};
use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A motor controller and geared drive motor turning a wheel.
///
/// The wheel is assumed to roll without slipping along its rolling
/// direction, so the motor speed follows the contact point speed set by the
/// rigid body simulation.
#[derive(Debug, Clone)]
pub struct SimDriveController {
    motor: DcMotor,

    /// Motor revolutions per wheel revolution
    reduction: f64,

    wheel_radius_m: f64,

    /// Units: volts
    reference_voltage_v: f64,

    /// Units: meters/second
    velocity_ms: f64,
}

/// A motor controller holding a module angle with a proportional loop.
#[derive(Debug, Clone)]
pub struct SimSteerController {
    motor: DcMotor,

    /// Motor revolutions per module revolution
    reduction: f64,

    /// Inertia about the steer axis
    ///
    /// Units: kilogram meters squared
    moi_kgm2: f64,

    /// Units: volts/radian
    k_p: f64,

    /// Units: radians
    reference_angle_rad: f64,

    /// Units: radians
    angle_rad: f64,

    /// Units: radians/second
    rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDriveController {
    pub fn new(motor: DcMotor, reduction: f64, wheel_radius_m: f64) -> Self {
        Self {
            motor,
            reduction,
            wheel_radius_m,
            reference_voltage_v: 0.0,
            velocity_ms: 0.0,
        }
    }

    pub fn reference_voltage_v(&self) -> f64 {
        self.reference_voltage_v
    }

    /// Wheel speed reached with the given voltage and no load.
    ///
    /// Units: meters/second
    pub fn free_speed_ms(&self, voltage_v: f64) -> f64 {
        self.motor.free_speed_rads(voltage_v) / self.reduction * self.wheel_radius_m
    }

    /// Set the contact point speed after the rigid body has moved.
    pub fn set_velocity_ms(&mut self, velocity_ms: f64) {
        self.velocity_ms = velocity_ms;
    }

    /// Units: radians/second
    pub fn motor_speed_rads(&self) -> f64 {
        self.velocity_ms / self.wheel_radius_m * self.reduction
    }

    /// Motor current with `voltage_v` applied at the present speed.
    ///
    /// Units: amps
    pub fn current_a(&self, voltage_v: f64) -> f64 {
        self.motor.current_a(voltage_v, self.motor_speed_rads())
    }

    /// Force at the contact point for the given motor current.
    ///
    /// Units: newtons
    pub fn force_n(&self, current_a: f64) -> f64 {
        self.motor.torque_nm(current_a) * self.reduction / self.wheel_radius_m
    }

    pub fn reset(&mut self) {
        self.reference_voltage_v = 0.0;
        self.velocity_ms = 0.0;
    }
}

impl DriveController for SimDriveController {
    fn set_reference_voltage(&mut self, voltage_v: f64) {
        self.reference_voltage_v = voltage_v;
    }

    fn get_state_velocity(&self) -> f64 {
        self.velocity_ms
    }
}

impl SimSteerController {
    pub fn new(motor: DcMotor, reduction: f64, moi_kgm2: f64, k_p: f64) -> Self {
        Self {
            motor,
            reduction,
            moi_kgm2,
            k_p,
            reference_angle_rad: 0.0,
            angle_rad: 0.0,
            rate_rads: 0.0,
        }
    }

    pub fn reference_angle_rad(&self) -> f64 {
        self.reference_angle_rad
    }

    /// Units: radians/second
    pub fn rate_rads(&self) -> f64 {
        self.rate_rads
    }

    /// Voltage the position loop asks for, limited to `max_voltage_v`.
    pub fn control_voltage_v(&self, max_voltage_v: f64) -> f64 {
        let max_voltage_v = max_voltage_v.max(0.0);

        (self.k_p * get_ang_dist(self.angle_rad, self.reference_angle_rad))
            .clamp(-max_voltage_v, max_voltage_v)
    }

    /// Move the module for `dt_s` with `voltage_v` applied to the motor,
    /// returning the mean motor current.
    ///
    /// Units: amps
    pub fn advance(&mut self, voltage_v: f64, dt_s: f64) -> f64 {
        let motor_rate_rads = self.rate_rads * self.reduction;
        let current_a = self.motor.current_a(voltage_v, motor_rate_rads);

        // Module inertia seen by the motor
        let moi_kgm2 = self.moi_kgm2 / self.reduction.powi(2);
        let tau_s = self.motor.time_constant_s(moi_kgm2);
        let free_rads = self.motor.free_speed_rads(voltage_v);

        // Unlimited the motor is first order, which is integrated exactly.
        // Once the current limit bites the torque is constant instead.
        let unlimited_a = (voltage_v - motor_rate_rads / self.motor.kv_radspv())
            / self.motor.resistance_ohm();
        let next_motor_rads = if (unlimited_a - current_a).abs() < f64::EPSILON {
            free_rads + (motor_rate_rads - free_rads) * (-dt_s / tau_s).exp()
        }
        else {
            motor_rate_rads + self.motor.torque_nm(current_a) / moi_kgm2 * dt_s
        };

        let next_rate_rads = next_motor_rads / self.reduction;
        self.angle_rad = wrap_pi(self.angle_rad + 0.5 * (self.rate_rads + next_rate_rads) * dt_s);
        self.rate_rads = next_rate_rads;

        current_a
    }

    /// Put the module at rest at the given angle.
    pub fn reset(&mut self, angle_rad: f64) {
        self.reference_angle_rad = wrap_pi(angle_rad);
        self.angle_rad = wrap_pi(angle_rad);
        self.rate_rads = 0.0;
    }
}

impl SteerController for SimSteerController {
    fn set_reference_angle(&mut self, angle_rad: f64) {
        self.reference_angle_rad = wrap_pi(angle_rad);
    }

    fn get_state_angle(&self) -> f64 {
        self.angle_rad
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::{MotorParams, Params};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn steer() -> SimSteerController {
        let p = Params::default();
        SimSteerController::new(
            DcMotor::new(&p.steer_motor),
            p.steer_reduction,
            p.steer_moi_kgm2,
            p.steer_k_p,
        )
    }

    #[test]
    fn test_steer_settles() {
        let mut s = steer();
        s.set_reference_angle(FRAC_PI_2);

        // Half a second at 1 kHz
        for _ in 0..500 {
            let v = s.control_voltage_v(12.0);
            s.advance(v, 0.001);
        }

        assert_abs_diff_eq!(s.get_state_angle(), FRAC_PI_2, epsilon = 1e-3);
        assert_abs_diff_eq!(s.rate_rads(), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_steer_shortest_way() {
        let mut s = steer();
        s.reset(3.0);
        s.set_reference_angle(-3.0);

        // Going the short way through pi means a positive voltage
        assert!(s.control_voltage_v(12.0) > 0.0);
        assert_abs_diff_eq!(s.control_voltage_v(0.0), 0.0);
    }

    #[test]
    fn test_drive_force() {
        let p = Params::default();
        let mut d = SimDriveController::new(
            DcMotor::new(&MotorParams::falcon_500()),
            p.drive_reduction,
            0.0762,
        );

        // Stalled, full voltage pushes forwards
        assert!(d.force_n(d.current_a(12.0)) > 0.0);

        // At free speed there is (almost) nothing left
        let free_ms = d.free_speed_ms(12.0);
        d.set_velocity_ms(free_ms);
        assert!(d.current_a(12.0).abs() < 1e-9);
        assert_abs_diff_eq!(d.get_state_velocity(), free_ms);
    }
}
