//! Dead-reckoning pose estimate from measured module states

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{ModuleState, SwerveKinematics};
use crate::drive_params::ModuleArray;
use crate::geom::{Pose2, Transform2};
use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Integrates the forward kinematics into a field pose.
///
/// The heading is taken from the gyro rather than the module states, as the
/// gyro drifts far slower than the wheels slip.
#[derive(Debug, Clone, Copy)]
pub struct Odometry {
    pose: Pose2,

    /// Added to the gyro angle to get the field heading.
    ///
    /// Units: radians
    gyro_offset_rad: f64,

    /// Gyro angle at the previous update.
    ///
    /// Units: radians
    prev_gyro_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Start the odometry at `initial_pose` with the gyro currently reading
    /// `gyro_rad`.
    pub fn new(initial_pose: Pose2, gyro_rad: f64) -> Self {
        Self {
            pose: initial_pose,
            gyro_offset_rad: wrap_pi(initial_pose.heading_rad - gyro_rad),
            prev_gyro_rad: gyro_rad,
        }
    }

    /// Move the estimate to a known pose.
    pub fn reset(&mut self, pose: Pose2, gyro_rad: f64) {
        *self = Self::new(pose, gyro_rad);
    }

    pub fn pose(&self) -> Pose2 {
        self.pose
    }

    /// Advance the estimate by `dt_s` given the measured module states and the
    /// current gyro angle.
    pub fn update(
        &mut self,
        kin: &SwerveKinematics,
        states: &ModuleArray<ModuleState>,
        gyro_rad: f64,
        dt_s: f64,
    ) -> Pose2 {
        let chassis = kin.to_chassis_velocity(states);
        let dtheta = get_ang_dist(self.prev_gyro_rad, gyro_rad);

        // Move along the arc in the body frame, then take the heading from the
        // gyro directly so rounding in the arc does not accumulate.
        let delta = Transform2::exp(chassis.vx_ms * dt_s, chassis.vy_ms * dt_s, dtheta);
        let mut pose = self.pose.transform_by(&delta);
        pose.heading_rad = wrap_pi(gyro_rad + self.gyro_offset_rad);

        self.pose = pose;
        self.prev_gyro_rad = gyro_rad;

        pose
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_params::Params;
    use crate::kinematics::ChassisVelocity;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_straight_line() {
        let mut kin = SwerveKinematics::new(&Params::default()).unwrap();
        let (states, _) = kin
            .to_module_states(&ChassisVelocity::new(1.0, 0.0, 0.0), &Vector2::zeros())
            .unwrap();

        // Robot faces +Y on the field, gyro reads zero
        let mut odom = Odometry::new(Pose2::new(1.0, 1.0, FRAC_PI_2), 0.0);
        for _ in 0..50 {
            odom.update(&kin, &states, 0.0, 0.02);
        }

        assert_abs_diff_eq!(odom.pose().x_m(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(odom.pose().y_m(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(odom.pose().heading_rad, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_arc() {
        let mut kin = SwerveKinematics::new(&Params::default()).unwrap();

        // Half circle of radius 1 m
        let cmd = ChassisVelocity::new(1.0, 0.0, 1.0);
        let (states, report) = kin.to_module_states(&cmd, &Vector2::zeros()).unwrap();
        assert!(!report.desaturated);

        let mut odom = Odometry::new(Pose2::new(0.0, 0.0, 0.0), 0.0);
        let dt = PI / 100.0;
        for i in 1..=100 {
            odom.update(&kin, &states, dt * i as f64, dt);
        }

        assert_abs_diff_eq!(odom.pose().x_m(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(odom.pose().y_m(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(odom.pose().heading_rad.abs(), PI, epsilon = 1e-9);
    }
}
