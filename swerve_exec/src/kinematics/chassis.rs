//! Chassis velocity

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use crate::drive_params::Params;
use crate::geom::Transform2;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The instantaneous velocity of the robot, expressed in the robot frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisVelocity {
    /// Forward velocity.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Leftward (strafe) velocity.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Anticlockwise rotation rate.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisVelocity {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self { vx_ms, vy_ms, omega_rads }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Convert a velocity given in the field frame into the robot frame,
    /// given the robot's current heading.
    pub fn from_field_relative(
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
        heading_rad: f64,
    ) -> Self {
        let v = Rotation2::new(-heading_rad) * Vector2::new(vx_ms, vy_ms);
        Self::new(v.x, v.y, omega_rads)
    }

    /// The translational part of this velocity rotated into the field frame.
    ///
    /// Units: meters/second
    pub fn to_field_relative(&self, heading_rad: f64) -> Vector2<f64> {
        Rotation2::new(heading_rad) * self.translation_ms()
    }

    /// The translational part of this velocity.
    ///
    /// Units: meters/second
    pub fn translation_ms(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    pub fn is_finite(&self) -> bool {
        self.vx_ms.is_finite() && self.vy_ms.is_finite() && self.omega_rads.is_finite()
    }

    /// Correct for the translation error caused by commanding translation
    /// and rotation together over a finite period.
    ///
    /// Returns the velocity which, held for `dt_s`, moves the robot along an
    /// arc ending at the pose that the (simultaneous) command intends.
    pub fn discretize(&self, dt_s: f64) -> Self {
        let (dx, dy, dtheta) = Transform2::new(
            Vector2::new(self.vx_ms * dt_s, self.vy_ms * dt_s),
            self.omega_rads * dt_s,
        )
        .log();

        Self::new(dx / dt_s, dy / dt_s, dtheta / dt_s)
    }

    /// Limit the command to the robot's forward, strafe and rotate maxima.
    ///
    /// Returns the limited velocity and whether any limit was applied.
    pub fn clamp_to_limits(&self, params: &Params) -> (Self, bool) {
        let limited = Self::new(
            clamp(
                &self.vx_ms,
                &-params.max_fwd_rev_speed_ms,
                &params.max_fwd_rev_speed_ms,
            ),
            clamp(
                &self.vy_ms,
                &-params.max_strafe_speed_ms,
                &params.max_strafe_speed_ms,
            ),
            clamp(
                &self.omega_rads,
                &-params.max_rotate_speed_rads,
                &params.max_rotate_speed_rads,
            ),
        );

        (limited, limited != *self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_field_relative_round_trip() {
        // Robot facing field +Y, asked to move along field +X: that's to the
        // robot's right.
        let v = ChassisVelocity::from_field_relative(1.0, 0.0, 0.5, FRAC_PI_2);
        assert_abs_diff_eq!(v.vx_ms, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vy_ms, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.omega_rads, 0.5);

        let f = v.to_field_relative(FRAC_PI_2);
        assert_abs_diff_eq!(f.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_discretize_pure_translation_unchanged() {
        let v = ChassisVelocity::new(1.0, -0.5, 0.0).discretize(0.02);
        assert_abs_diff_eq!(v.vx_ms, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v.vy_ms, -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_discretize_reaches_intended_pose() {
        let dt = 0.5;
        let cmd = ChassisVelocity::new(2.0, 0.0, 1.0);
        let d = cmd.discretize(dt);

        // Following the arc of the discretized velocity must end at the pose
        // the command intended
        let t = Transform2::exp(d.vx_ms * dt, d.vy_ms * dt, d.omega_rads * dt);
        assert_abs_diff_eq!(t.translation_m.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.translation_m.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.rotation_rad, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_clamp_to_limits() {
        let params = Params::default();
        let (v, limited) = ChassisVelocity::new(10.0, 0.1, -20.0).clamp_to_limits(&params);
        assert!(limited);
        assert_abs_diff_eq!(v.vx_ms, params.max_fwd_rev_speed_ms);
        assert_abs_diff_eq!(v.vy_ms, 0.1);
        assert_abs_diff_eq!(v.omega_rads, -params.max_rotate_speed_rads);

        let (_, limited) = ChassisVelocity::new(1.0, 0.0, 0.0).clamp_to_limits(&params);
        assert!(!limited);
    }
}
