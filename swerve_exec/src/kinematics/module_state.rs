//! Speed and angle of a single swerve module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The demanded or measured state of one module.
///
/// The speed is never negative. A wheel turning backwards is represented by
/// the positive speed with the angle rotated by pi.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Linear speed of the wheel's contact point.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Angle of the wheel's rolling direction relative to robot X, in
    /// (-pi, pi].
    ///
    /// Units: radians
    pub angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleState {
    /// Create a new state, normalising a negative speed into a positive speed
    /// with the angle turned around.
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        if speed_ms < 0.0 {
            Self {
                speed_ms: -speed_ms,
                angle_rad: wrap_pi(angle_rad + std::f64::consts::PI),
            }
        }
        else {
            Self {
                speed_ms,
                angle_rad: wrap_pi(angle_rad),
            }
        }
    }

    /// Build the state from the module's velocity vector in the robot frame.
    pub fn from_velocity(vel_ms: &Vector2<f64>) -> Self {
        Self::new(vel_ms.norm(), vel_ms.y.atan2(vel_ms.x))
    }

    /// The module's velocity vector in the robot frame.
    ///
    /// Units: meters/second
    pub fn velocity_ms(&self) -> Vector2<f64> {
        let (s, c) = self.angle_rad.sin_cos();
        Vector2::new(self.speed_ms * c, self.speed_ms * s)
    }

    /// Reduce the steer motion needed to reach this state from
    /// `current_angle_rad`.
    ///
    /// If the target angle is more than 90 degrees away from the current
    /// angle the module is better off steering to the opposite angle and
    /// driving backwards. The returned speed is then negative, so the result
    /// is an actuator command rather than a normalised `ModuleState`.
    pub fn optimise(&self, current_angle_rad: f64) -> (f64, f64) {
        let delta = get_ang_dist(current_angle_rad, self.angle_rad);

        if delta.abs() > std::f64::consts::FRAC_PI_2 {
            (-self.speed_ms, wrap_pi(self.angle_rad + std::f64::consts::PI))
        }
        else {
            (self.speed_ms, self.angle_rad)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_negative_speed_flips_angle() {
        let s = ModuleState::new(-2.0, FRAC_PI_2);
        assert_abs_diff_eq!(s.speed_ms, 2.0);
        assert_abs_diff_eq!(s.angle_rad, -FRAC_PI_2, epsilon = 1e-12);

        let s = ModuleState::new(-1.0, 0.0);
        assert_abs_diff_eq!(s.angle_rad, PI, epsilon = 1e-12);

        // Same velocity either way
        let v = ModuleState::new(-1.5, 0.3).velocity_ms();
        let w = ModuleState::new(1.5, 0.3).velocity_ms();
        assert_abs_diff_eq!(v, -w, epsilon = 1e-12);
    }

    #[test]
    fn test_from_velocity() {
        let s = ModuleState::from_velocity(&Vector2::new(0.0, -3.0));
        assert_abs_diff_eq!(s.speed_ms, 3.0);
        assert_abs_diff_eq!(s.angle_rad, -FRAC_PI_2);
    }

    #[test]
    fn test_optimise() {
        let s = ModuleState::new(1.0, PI - 0.1);

        // Current angle near zero: steer to -0.1 and drive backwards
        let (speed, angle) = s.optimise(0.0);
        assert_abs_diff_eq!(speed, -1.0);
        assert_abs_diff_eq!(angle, -0.1, epsilon = 1e-12);

        // Current angle near pi: no change
        let (speed, angle) = s.optimise(3.0);
        assert_abs_diff_eq!(speed, 1.0);
        assert_abs_diff_eq!(angle, PI - 0.1, epsilon = 1e-12);
    }
}
