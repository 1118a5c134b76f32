//! Rigid body model of the robot on the field

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

// Internal
use super::{Params, GRAVITY_MSS};
use crate::drive_params::{self, ModuleArray, ModuleGeometry, ModuleId};
use crate::geom::Pose2;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion state of the robot body.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RigidBody {
    pub pose: Pose2,

    /// Velocity of the robot centre in the field frame.
    ///
    /// Units: meters/second
    pub vel_ms: Vector2<f64>,

    /// Units: radians/second
    pub omega_rads: f64,
}

/// Forces acting between the floor and the robot.
#[derive(Debug, Clone)]
pub struct Drivetrain {
    positions_m: ModuleArray<Vector2<f64>>,

    mass_kg: f64,

    moi_kgm2: f64,

    /// Largest force one wheel can exert before it slips.
    ///
    /// Units: newtons
    traction_limit_n: f64,

    /// Units: newtons/(meter/second)
    lateral_damping_nspm: f64,

    /// Units: meters
    min_translation_m: Vector2<f64>,

    /// Units: meters
    max_translation_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RigidBody {
    /// A body at rest at the given pose.
    pub fn at_rest(pose: Pose2) -> Self {
        Self {
            pose,
            vel_ms: Vector2::zeros(),
            omega_rads: 0.0,
        }
    }
}

impl Drivetrain {
    pub fn new(
        drive_params: &drive_params::Params,
        sim_params: &Params,
        geom: &ModuleGeometry,
    ) -> Self {
        Self {
            positions_m: geom.positions_m(),
            mass_kg: drive_params.mass_kg,
            moi_kgm2: drive_params.moi_kgm2,
            traction_limit_n: sim_params.wheel_friction_coeff * drive_params.mass_kg * GRAVITY_MSS
                / drive_params::NUM_MODULES as f64,
            lateral_damping_nspm: sim_params.lateral_damping_nspm,
            min_translation_m: drive_params.min_robot_translation_m(),
            max_translation_m: drive_params.max_robot_translation_m(),
        }
    }

    pub fn traction_limit_n(&self) -> f64 {
        self.traction_limit_n
    }

    /// Velocity of each wheel contact point in the robot frame.
    ///
    /// Units: meters/second
    pub fn contact_velocities_ms(&self, body: &RigidBody) -> ModuleArray<Vector2<f64>> {
        let vel_robot_ms = Rotation2::new(-body.pose.heading_rad) * body.vel_ms;

        let mut vels = [Vector2::zeros(); drive_params::NUM_MODULES];
        for id in ModuleId::ALL.iter() {
            let r = self.positions_m[id.index()];
            vels[id.index()] = vel_robot_ms + body.omega_rads * Vector2::new(-r.y, r.x);
        }

        vels
    }

    /// Speed of each contact point along its wheel's rolling direction.
    ///
    /// Units: meters/second
    pub fn rolling_speeds_ms(
        &self,
        body: &RigidBody,
        steer_angles_rad: &ModuleArray<f64>,
    ) -> ModuleArray<f64> {
        let vels = self.contact_velocities_ms(body);

        let mut speeds = [0.0; drive_params::NUM_MODULES];
        for i in 0..drive_params::NUM_MODULES {
            let (s, c) = steer_angles_rad[i].sin_cos();
            speeds[i] = vels[i].dot(&Vector2::new(c, s));
        }

        speeds
    }

    /// Advance the body by `dt_s` with the given drive forces acting along
    /// each wheel.
    ///
    /// The forces are found from the velocities at the start of the step and
    /// applied to the velocity before the position is moved (semi-implicit
    /// Euler). A body pushed into a field wall stops against it.
    pub fn advance(
        &self,
        body: &mut RigidBody,
        steer_angles_rad: &ModuleArray<f64>,
        drive_forces_n: &ModuleArray<f64>,
        dt_s: f64,
    ) {
        let vels = self.contact_velocities_ms(body);

        let mut force_n = Vector2::zeros();
        let mut torque_nm = 0.0;

        for i in 0..drive_params::NUM_MODULES {
            let (s, c) = steer_angles_rad[i].sin_cos();
            let along = Vector2::new(c, s);
            let across = Vector2::new(-s, c);

            // The scrub force cannot overshoot zero sideways speed in one step
            let max_damping_nspm = self.mass_kg / drive_params::NUM_MODULES as f64 / dt_s;
            let lateral_n =
                -self.lateral_damping_nspm.min(max_damping_nspm) * vels[i].dot(&across);

            let mut wheel_n = along * drive_forces_n[i] + across * lateral_n;

            // Friction circle
            let mag_n = wheel_n.norm();
            if mag_n > self.traction_limit_n {
                wheel_n *= self.traction_limit_n / mag_n;
            }

            let r = self.positions_m[i];
            force_n += wheel_n;
            torque_nm += r.x * wheel_n.y - r.y * wheel_n.x;
        }

        let force_field_n = Rotation2::new(body.pose.heading_rad) * force_n;
        body.vel_ms += force_field_n / self.mass_kg * dt_s;
        body.omega_rads += torque_nm / self.moi_kgm2 * dt_s;

        body.pose.position_m += body.vel_ms * dt_s;
        body.pose.heading_rad = wrap_pi(body.pose.heading_rad + body.omega_rads * dt_s);

        for axis in 0..2 {
            let min = self.min_translation_m[axis];
            let max = self.max_translation_m[axis];
            let pos = body.pose.position_m[axis];

            if pos < min || pos > max {
                body.pose.position_m[axis] = pos.clamp(min, max);
                body.vel_ms[axis] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn drivetrain() -> Drivetrain {
        let dp = drive_params::Params::default();
        let geom = ModuleGeometry::from_params(&dp).unwrap();
        Drivetrain::new(&dp, &Params::default(), &geom)
    }

    #[test]
    fn test_push_forwards() {
        let dt = drivetrain();
        let mut body = RigidBody::at_rest(Pose2::new(5.0, 5.0, FRAC_PI_2));

        // 50 N per wheel along robot X, which is field +Y here
        for _ in 0..100 {
            dt.advance(&mut body, &[0.0; 4], &[50.0; 4], 0.001);
        }

        let dp = drive_params::Params::default();
        let expected_ms = 200.0 / dp.mass_kg * 0.1;
        assert_abs_diff_eq!(body.vel_ms.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.vel_ms.y, expected_ms, epsilon = 1e-9);
        assert_abs_diff_eq!(body.omega_rads, 0.0, epsilon = 1e-9);
        assert!(body.pose.y_m() > 5.0);

        // The wheels are rolling forwards at the body speed
        let speeds = dt.rolling_speeds_ms(&body, &[0.0; 4]);
        for s in speeds.iter() {
            assert_abs_diff_eq!(*s, expected_ms, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_traction_limit() {
        let dt = drivetrain();
        let mut body = RigidBody::at_rest(Pose2::new(5.0, 5.0, 0.0));

        dt.advance(&mut body, &[0.0; 4], &[1e6; 4], 0.001);

        let max_accel = 4.0 * dt.traction_limit_n() / drive_params::Params::default().mass_kg;
        assert_abs_diff_eq!(body.vel_ms.x, max_accel * 0.001, epsilon = 1e-9);
    }

    #[test]
    fn test_scrub_stops_sideways_slide() {
        let dt = drivetrain();
        let mut body = RigidBody::at_rest(Pose2::new(5.0, 5.0, 0.0));
        body.vel_ms = Vector2::new(0.0, 1.0);

        // Wheels point along X so the slide is resisted
        for _ in 0..500 {
            dt.advance(&mut body, &[0.0; 4], &[0.0; 4], 0.001);
        }

        assert_abs_diff_eq!(body.vel_ms.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_wall_clamp() {
        let dt = drivetrain();
        let mut body = RigidBody::at_rest(Pose2::new(0.001, 5.0, 0.0));
        body.vel_ms = Vector2::new(-2.0, 0.5);

        dt.advance(&mut body, &[0.0; 4], &[0.0; 4], 0.001);

        assert_abs_diff_eq!(body.pose.x_m(), 0.0);
        assert_abs_diff_eq!(body.vel_ms.x, 0.0);
        assert!(body.vel_ms.y.abs() > 0.0);
    }
}
