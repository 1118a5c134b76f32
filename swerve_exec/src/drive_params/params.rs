//! Parameters structure for the drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::{check_non_negative, check_positive, ConfigError};
use crate::geom::{Pose2, Transform2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const M_PER_FT: f64 = 0.3048;
const M_PER_IN: f64 = 0.0254;
const KG_PER_LB: f64 = 0.453_592_37;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical constants of the robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Distance between the left and right module contact points.
    ///
    /// Units: meters
    pub wheelbase_width_m: f64,

    /// Distance between the front and back module contact points.
    ///
    /// Units: meters
    pub wheelbase_length_m: f64,

    /// Radius of the drive wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Transform from the robot centre to the vision camera.
    pub robot_to_camera: Transform2,

    // ---- MASS PROPERTIES ----

    /// Mass of the robot.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Moment of inertia of the robot about its vertical axis.
    ///
    /// Units: kilogram meters squared
    pub moi_kgm2: f64,

    // ---- CAPABILITIES ----

    /// Maximum forward/reverse speed of the chassis.
    ///
    /// Units: meters/second
    pub max_fwd_rev_speed_ms: f64,

    /// Maximum sideways speed of the chassis.
    ///
    /// Units: meters/second
    pub max_strafe_speed_ms: f64,

    /// Maximum rotation rate of the chassis.
    ///
    /// Units: radians/second
    pub max_rotate_speed_rads: f64,

    /// Maximum translational acceleration of the chassis.
    ///
    /// Units: meters/second^2
    pub max_translate_accel_mss: f64,

    /// Maximum rotational acceleration of the chassis.
    ///
    /// Units: radians/second^2
    pub max_rotate_accel_radss: f64,

    /// Maximum speed any one module's wheel can be driven at.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,

    // ---- SENSORS ----

    /// Drive encoder counts per wheel revolution.
    pub drive_enc_counts_per_rev: u32,

    /// Steer encoder counts per module revolution.
    pub steer_enc_counts_per_rev: u32,

    // ---- FIELD ----

    /// Length of the field (along field X).
    ///
    /// Units: meters
    pub field_length_m: f64,

    /// Width of the field (along field Y).
    ///
    /// Units: meters
    pub field_width_m: f64,

    /// Assumed starting pose of the robot. Routines may override this.
    pub default_start_pose: Pose2,

    // ---- TIMING ----

    /// Period of the control loop.
    ///
    /// Units: seconds
    pub ctrl_period_s: f64,

    /// Period of one physical simulation sub-step.
    ///
    /// Units: seconds
    pub sim_period_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        let wheelbase_width_m = 2.0 * M_PER_FT;
        let mass_kg = 140.0 * KG_PER_LB;
        let max_fwd_rev_speed_ms = 12.0 * M_PER_FT;
        let max_rotate_speed_rads = 360f64.to_radians();

        Self {
            wheelbase_width_m,
            wheelbase_length_m: wheelbase_width_m,
            wheel_radius_m: 3.0 * M_PER_IN,
            robot_to_camera: Transform2::new(Vector2::new(wheelbase_width_m / 2.0, 0.0), 0.0),

            mass_kg,
            // Square slab slightly bigger than the wheelbase, axis through the centre
            moi_kgm2: 1.0 / 12.0 * mass_kg * (wheelbase_width_m * 1.1).powi(2) * 2.0,

            max_fwd_rev_speed_ms,
            max_strafe_speed_ms: 8.0 * M_PER_FT,
            max_rotate_speed_rads,
            // 0 to full speed in 0.25 s
            max_translate_accel_mss: max_fwd_rev_speed_ms / 0.25,
            max_rotate_accel_radss: max_rotate_speed_rads / 0.25,
            max_module_speed_ms: max_fwd_rev_speed_ms,

            drive_enc_counts_per_rev: 1024,
            steer_enc_counts_per_rev: 1024,

            field_length_m: 54.0 * M_PER_FT,
            field_width_m: 27.0 * M_PER_FT,
            default_start_pose: Pose2::from_degrees(24.0 * M_PER_FT, 10.0 * M_PER_FT, 180.0),

            ctrl_period_s: 0.02,
            sim_period_s: 0.001,
        }
    }
}

impl Params {

    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("wheelbase_width_m", self.wheelbase_width_m)?;
        check_positive("wheelbase_length_m", self.wheelbase_length_m)?;
        check_positive("wheel_radius_m", self.wheel_radius_m)?;
        check_positive("mass_kg", self.mass_kg)?;
        check_positive("moi_kgm2", self.moi_kgm2)?;
        check_positive("max_fwd_rev_speed_ms", self.max_fwd_rev_speed_ms)?;
        check_positive("max_strafe_speed_ms", self.max_strafe_speed_ms)?;
        check_positive("max_rotate_speed_rads", self.max_rotate_speed_rads)?;
        check_positive("max_translate_accel_mss", self.max_translate_accel_mss)?;
        check_positive("max_rotate_accel_radss", self.max_rotate_accel_radss)?;
        check_positive("max_module_speed_ms", self.max_module_speed_ms)?;
        check_positive("field_length_m", self.field_length_m)?;
        check_positive("field_width_m", self.field_width_m)?;
        check_positive("ctrl_period_s", self.ctrl_period_s)?;
        check_positive("sim_period_s", self.sim_period_s)?;
        check_non_negative("default_start_pose.x", self.default_start_pose.x_m())?;
        check_non_negative("default_start_pose.y", self.default_start_pose.y_m())?;

        if self.drive_enc_counts_per_rev == 0 || self.steer_enc_counts_per_rev == 0 {
            return Err(ConfigError::Invalid {
                name: "enc_counts_per_rev",
                reason: String::from("encoders must have at least one count per revolution"),
            });
        }

        // The simulation must run a whole number of sub-steps per control cycle
        let ratio = self.ctrl_period_s / self.sim_period_s;
        if ratio < 1.0 || (ratio - ratio.round()).abs() > 1e-6 {
            return Err(ConfigError::PeriodMismatch {
                ctrl_period_s: self.ctrl_period_s,
                sim_period_s: self.sim_period_s,
            });
        }

        Ok(())
    }

    /// Number of simulation sub-steps in one control cycle.
    pub fn num_sim_sub_steps(&self) -> u64 {
        util::time::num_sub_periods(self.ctrl_period_s, self.sim_period_s)
    }

    /// Convert a drive encoder count into wheel travel distance.
    ///
    /// Units: meters
    pub fn drive_counts_to_m(&self, counts: i64) -> f64 {
        counts as f64 / self.drive_enc_counts_per_rev as f64
            * std::f64::consts::TAU
            * self.wheel_radius_m
    }

    /// Quantise a wheel travel distance to the nearest whole drive encoder count.
    pub fn m_to_drive_counts(&self, dist_m: f64) -> i64 {
        (dist_m / (std::f64::consts::TAU * self.wheel_radius_m)
            * self.drive_enc_counts_per_rev as f64)
            .round() as i64
    }

    /// Convert a steer encoder count into a module angle.
    ///
    /// Units: radians
    pub fn steer_counts_to_rad(&self, counts: i64) -> f64 {
        counts as f64 / self.steer_enc_counts_per_rev as f64 * std::f64::consts::TAU
    }

    /// Quantise a module angle to the nearest whole steer encoder count.
    pub fn rad_to_steer_counts(&self, angle_rad: f64) -> i64 {
        (angle_rad / std::f64::consts::TAU * self.steer_enc_counts_per_rev as f64).round() as i64
    }

    /// Lower corner of the region the robot centre may occupy on the field.
    pub fn min_robot_translation_m(&self) -> Vector2<f64> {
        Vector2::zeros()
    }

    /// Upper corner of the region the robot centre may occupy on the field.
    pub fn max_robot_translation_m(&self) -> Vector2<f64> {
        Vector2::new(self.field_length_m, self.field_width_m)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.num_sim_sub_steps(), 20);
        assert_relative_eq!(p.wheelbase_width_m, 0.6096);
        assert_relative_eq!(p.max_translate_accel_mss, 14.6304, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_values_fail() {
        let mut p = Params::default();
        p.mass_kg = 0.0;
        assert_eq!(
            p.validate(),
            Err(ConfigError::NonPositive { name: "mass_kg", value: 0.0 })
        );

        let mut p = Params::default();
        p.max_module_speed_ms = -1.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.sim_period_s = 0.003;
        assert!(matches!(p.validate(), Err(ConfigError::PeriodMismatch { .. })));
    }

    #[test]
    fn test_encoder_quantisation() {
        let p = Params::default();
        let circ_m = std::f64::consts::TAU * p.wheel_radius_m;

        assert_eq!(p.m_to_drive_counts(circ_m), 1024);
        assert_relative_eq!(p.drive_counts_to_m(512), circ_m / 2.0, epsilon = 1e-12);
        assert_eq!(p.rad_to_steer_counts(std::f64::consts::PI), 512);
        assert_relative_eq!(p.steer_counts_to_rad(256), std::f64::consts::FRAC_PI_2);
    }
}
