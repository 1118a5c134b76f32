//! Trajectory generation from waypoints

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::{Deserialize, Serialize};

// Internal
use super::{profile::Profiler, PathPoint, QuinticSpline, TrajConfig, Trajectory};
use crate::drive_params::{check_finite, ConfigError};
use crate::geom::Pose2;
use util::maths::{get_ang_dist, lerp_angle, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point the trajectory must pass through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the waypoint, with the heading giving the direction of
    /// the path through it.
    pub pose: Pose2,

    /// Heading the robot should face at this waypoint. If `None` the robot
    /// faces along the path.
    ///
    /// Units: radians
    pub heading_rad: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(pose: Pose2, heading_rad: Option<f64>) -> Self {
        Self { pose, heading_rad }
    }

    /// The heading the robot faces at this waypoint.
    pub fn robot_heading_rad(&self) -> f64 {
        wrap_pi(self.heading_rad.unwrap_or(self.pose.heading_rad))
    }
}

impl From<Pose2> for Waypoint {
    fn from(pose: Pose2) -> Self {
        Self::new(pose, None)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Generate a trajectory through the given poses, with the robot facing the
/// matching entry of `headings_rad` at each one.
pub fn generate_with_headings(
    poses: &[Pose2],
    headings_rad: &[f64],
    config: &TrajConfig,
) -> Result<Trajectory, ConfigError> {
    if headings_rad.len() != poses.len() {
        return Err(ConfigError::HeadingCountMismatch {
            expected: poses.len(),
            found: headings_rad.len(),
        });
    }

    let waypoints: Vec<Waypoint> = poses
        .iter()
        .zip(headings_rad.iter())
        .map(|(p, h)| Waypoint::new(*p, Some(*h)))
        .collect();

    generate(&waypoints, config)
}

/// Generate a trajectory through the given waypoints.
pub fn generate(waypoints: &[Waypoint], config: &TrajConfig) -> Result<Trajectory, ConfigError> {
    if waypoints.len() < 2 {
        return Err(ConfigError::TooFewWaypoints(waypoints.len()));
    }
    config.params.validate()?;

    for wp in waypoints.iter() {
        check_finite("waypoint.x", wp.pose.x_m())?;
        check_finite("waypoint.y", wp.pose.y_m())?;
        check_finite("waypoint.heading", wp.pose.heading_rad)?;
        if let Some(h) = wp.heading_rad {
            check_finite("waypoint.robot_heading", h)?;
        }
    }

    let points = build_path(waypoints, config)?;

    let constraints = config.all_constraints();
    let (profile, warnings) = Profiler::new(&points, &constraints, &config.params).run();

    if let Some(first) = warnings.first() {
        warn!(
            "Trajectory constraints clamped at {} point(s), first {}",
            warnings.len(),
            first
        );
        for w in warnings.iter() {
            debug!("Constraint clamped: {}", w);
        }
    }

    let traj = Trajectory::new(profile, config.params.sample_period_s, warnings);

    debug!(
        "Generated trajectory through {} waypoints: {} path points, {:.3} m, {:.3} s",
        waypoints.len(),
        points.len(),
        traj.path_length_m(),
        traj.total_time_s()
    );

    Ok(traj)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Fit and subdivide the splines, then add the robot heading along each.
fn build_path(waypoints: &[Waypoint], config: &TrajConfig) -> Result<Vec<PathPoint>, ConfigError> {
    let params = &config.params;
    let mut points: Vec<PathPoint> = Vec::new();

    for (i, pair) in waypoints.windows(2).enumerate() {
        let (start, end) = (&pair[0], &pair[1]);

        if start.pose.distance_to(&end.pose) < 1e-6 {
            return Err(ConfigError::Invalid {
                name: "waypoints",
                reason: format!("waypoints {} and {} are at the same position", i, i + 1),
            });
        }

        // A reversed path leaves each knot opposite to the pose heading
        let mut knot_start = start.pose;
        let mut knot_end = end.pose;
        if params.reversed {
            knot_start.heading_rad = wrap_pi(knot_start.heading_rad + std::f64::consts::PI);
            knot_end.heading_rad = wrap_pi(knot_end.heading_rad + std::f64::consts::PI);
        }

        let spline_points = QuinticSpline::from_poses(&knot_start, &knot_end).subdivide(
            params.max_dx_m,
            params.max_dy_m,
            params.max_dtheta_rad,
        )?;

        // Arc length along this spline at each of its points
        let mut local_m = vec![0.0; spline_points.len()];
        for j in 1..spline_points.len() {
            local_m[j] = local_m[j - 1]
                + (spline_points[j].position_m - spline_points[j - 1].position_m).norm();
        }
        let spline_len_m = local_m[local_m.len() - 1];

        let h0 = start.robot_heading_rad();
        let h1 = end.robot_heading_rad();
        let heading_rate_radpm = get_ang_dist(h0, h1) / spline_len_m;

        let start_length_m = points.last().map(|p| p.path_length_m).unwrap_or(0.0);

        // The first point of every spline after the first is the knot already
        // added as the last point of the previous one.
        match points.last_mut() {
            Some(knot) => {
                if heading_rate_radpm.abs() > knot.heading_rate_radpm.abs() {
                    knot.heading_rate_radpm = heading_rate_radpm;
                }
            }
            None => points.push(PathPoint {
                position_m: spline_points[0].position_m,
                travel_rad: spline_points[0].course_rad,
                heading_rad: h0,
                curvature_radpm: spline_points[0].curvature_radpm,
                heading_rate_radpm,
                path_length_m: 0.0,
            }),
        }

        for j in 1..spline_points.len() {
            let frac = local_m[j] / spline_len_m;
            points.push(PathPoint {
                position_m: spline_points[j].position_m,
                travel_rad: spline_points[j].course_rad,
                heading_rad: lerp_angle(h0, h1, frac),
                curvature_radpm: spline_points[j].curvature_radpm,
                heading_rate_radpm,
                path_length_m: start_length_m + local_m[j],
            });
        }

        // Land exactly on the requested heading at the knot
        if let Some(knot) = points.last_mut() {
            knot.heading_rad = h1;
        }
    }

    Ok(points)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_params::Params as DriveParams;
    use crate::kinematics::SwerveKinematics;
    use crate::traj_gen::{
        AccelBounds, ConstraintWarningKind, MaxVelocityRegion, Params, TrajConstraint,
    };
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn drive_config() -> TrajConfig {
        let kin = SwerveKinematics::new(&DriveParams::default()).unwrap();
        TrajConfig::for_drivetrain(Params::default(), &kin).unwrap()
    }

    #[test]
    fn test_too_few_waypoints() {
        let config = drive_config();
        let r = generate(&[Waypoint::from(Pose2::new(0.0, 0.0, 0.0))], &config);
        assert_eq!(r.unwrap_err(), ConfigError::TooFewWaypoints(1));

        let r = generate(&[], &config);
        assert_eq!(r.unwrap_err(), ConfigError::TooFewWaypoints(0));
    }

    #[test]
    fn test_heading_count_mismatch() {
        let poses = [Pose2::new(0.0, 0.0, 0.0), Pose2::new(1.0, 0.0, 0.0)];
        let r = generate_with_headings(&poses, &[0.0], &drive_config());
        assert_eq!(
            r.unwrap_err(),
            ConfigError::HeadingCountMismatch { expected: 2, found: 1 }
        );
    }

    #[test]
    fn test_diagonal_limits_respected() {
        // 0 to full speed in 0.25 s
        let drive = DriveParams::default();
        let config = drive_config();
        let max_speed = config.params.max_speed_ms;
        let max_accel = config.params.max_accel_mss;
        assert_abs_diff_eq!(max_accel, max_speed / 0.25, epsilon = 1e-9);

        let traj = generate(
            &[
                Waypoint::from(Pose2::from_degrees(0.0, 0.0, 0.0)),
                Waypoint::from(Pose2::from_degrees(3.0, 3.0, 0.0)),
            ],
            &config,
        )
        .unwrap();

        let states = traj.states();
        assert!(states.len() > 2);
        assert!(traj.warnings().is_empty());

        // Endpoints
        let first = states[0];
        let last = states[states.len() - 1];
        assert_abs_diff_eq!(first.pose.x_m(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.pose.y_m(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.pose.heading_rad, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.pose.x_m(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.pose.y_m(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.pose.heading_rad, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.velocity_ms, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(last.velocity_ms, 0.0, epsilon = 1e-9);

        // Fixed step, strictly increasing time
        for pair in states.windows(2) {
            assert_abs_diff_eq!(
                pair[1].time_s - pair[0].time_s,
                drive.ctrl_period_s,
                epsilon = 1e-9
            );
        }

        // Speed and acceleration limits
        for s in traj.profile_states().iter().chain(states.iter()) {
            assert!(s.velocity_ms <= max_speed + 1e-9);
            assert!(s.velocity_ms >= 0.0);
            assert!(s.accel_mss.abs() <= max_accel + 1e-6);
        }
        for pair in states.windows(2) {
            let dv = (pair[1].velocity_ms - pair[0].velocity_ms).abs();
            assert!(dv <= max_accel * drive.ctrl_period_s + 1e-6);
        }

        // Long enough to reach full speed
        let peak = states.iter().map(|s| s.velocity_ms).fold(0f64, f64::max);
        assert!(peak > 0.5 * max_speed);
    }

    #[test]
    fn test_modules_within_limit_while_turning() {
        let drive = DriveParams::default();
        let mut kin = SwerveKinematics::new(&drive).unwrap();
        let config = TrajConfig::for_drivetrain(Params::default(), &kin).unwrap();

        let traj = generate_with_headings(
            &[
                Pose2::from_degrees(1.0, 1.0, 45.0),
                Pose2::from_degrees(4.0, 4.0, 0.0),
                Pose2::from_degrees(7.0, 1.0, -45.0),
            ],
            &[180f64.to_radians(), FRAC_PI_2, 0.0],
            &config,
        )
        .unwrap();

        assert_abs_diff_eq!(traj.initial_pose().heading_rad.abs(), std::f64::consts::PI, epsilon = 1e-9);
        assert_abs_diff_eq!(traj.final_pose().heading_rad, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(traj.final_pose().x_m(), 7.0, epsilon = 1e-9);

        // The feedforward never asks a module for more than its limit
        for s in traj.profile_states() {
            let cmd = s.chassis_velocity();
            let max_speed = kin.max_raw_module_speed_ms(&cmd);
            assert!(max_speed <= drive.max_module_speed_ms + 1e-6);

            let (_, report) = kin.to_module_states(&cmd, &nalgebra::Vector2::zeros()).unwrap();
            assert!(report.desat_scale > 1.0 - 1e-6);
        }
    }

    fn straight(length_m: f64, params: Params) -> Trajectory {
        generate(
            &[
                Waypoint::from(Pose2::new(0.0, 0.0, 0.0)),
                Waypoint::from(Pose2::new(length_m, 0.0, 0.0)),
            ],
            &TrajConfig::new(params).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_shorter_than_one_step() {
        // Both are within a single max_dx_m step
        for &length_m in [0.05, 0.127].iter() {
            let traj = straight(length_m, Params::default());
            let states = traj.states();

            assert!(states.len() >= 3);
            assert_abs_diff_eq!(states[0].velocity_ms, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(states[states.len() - 1].velocity_ms, 0.0, epsilon = 1e-9);
            assert!(states[1].velocity_ms > 0.0);
            assert!(traj.total_time_s() > 0.0 && traj.total_time_s().is_finite());
            assert_abs_diff_eq!(traj.final_pose().x_m(), length_m, epsilon = 1e-9);
            assert!(traj.warnings().is_empty());
        }
    }

    #[test]
    fn test_start_and_end_speeds() {
        let mut params = Params::default();
        params.start_speed_ms = 1.0;
        let traj = straight(3.0, params);
        let states = traj.states();
        assert_abs_diff_eq!(states[0].velocity_ms, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(states[states.len() - 1].velocity_ms, 0.0, epsilon = 1e-9);
        assert!(traj.warnings().is_empty());

        let mut params = Params::default();
        params.end_speed_ms = 1.0;
        let traj = straight(3.0, params);
        let states = traj.states();
        assert_abs_diff_eq!(states[0].velocity_ms, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(states[states.len() - 1].velocity_ms, 1.0, epsilon = 1e-9);
        assert!(traj.warnings().is_empty());
    }

    #[test]
    fn test_unreachable_end_speeds_warned() {
        // Too short to accelerate to the end speed
        let mut params = Params::default();
        params.end_speed_ms = 3.0;
        let traj = straight(0.3, params);
        let last = traj.states()[traj.states().len() - 1];
        assert!(last.velocity_ms < 3.0);

        let warning = traj
            .warnings()
            .iter()
            .find_map(|w| match w.kind {
                ConstraintWarningKind::EndSpeedUnreachable { reached_ms, requested_ms } => {
                    Some((reached_ms, requested_ms))
                }
                _ => None,
            })
            .unwrap();
        assert_abs_diff_eq!(warning.0, last.velocity_ms, epsilon = 1e-9);
        assert_abs_diff_eq!(warning.1, 3.0, epsilon = 1e-9);

        // Start speed above the maximum is clamped to it
        let mut params = Params::default();
        let max_speed = params.max_speed_ms;
        params.start_speed_ms = max_speed + 1.0;
        let traj = straight(3.0, params);
        assert_abs_diff_eq!(traj.states()[0].velocity_ms, max_speed, epsilon = 1e-9);
        assert!(traj.warnings().iter().any(|w| matches!(
            w.kind,
            ConstraintWarningKind::StartSpeedUnreachable { requested_ms, .. }
                if (requested_ms - (max_speed + 1.0)).abs() < 1e-9
        )));
    }

    #[test]
    fn test_reversed() {
        let mut params = Params::default();
        params.reversed = true;
        let config = TrajConfig::new(params).unwrap();

        // Robot faces +X and backs up to x = 0
        let traj = generate(
            &[
                Waypoint::from(Pose2::new(2.0, 0.0, 0.0)),
                Waypoint::from(Pose2::new(0.0, 0.0, 0.0)),
            ],
            &config,
        )
        .unwrap();

        let mid = traj.sample(traj.total_time_s() / 2.0);
        assert!(mid.velocity_ms < 0.0);
        assert_abs_diff_eq!(mid.pose.heading_rad, 0.0, epsilon = 1e-9);
        assert!(mid.field_velocity_ms().x < 0.0);
        assert!(mid.chassis_velocity().vx_ms < 0.0);
        assert_abs_diff_eq!(traj.final_pose().x_m(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_region_slows_trajectory() {
        let fast = generate(
            &[
                Waypoint::from(Pose2::new(0.0, 0.0, 0.0)),
                Waypoint::from(Pose2::new(4.0, 0.0, 0.0)),
            ],
            &TrajConfig::new(Params::default()).unwrap(),
        )
        .unwrap();

        let mut params = Params::default();
        params.velocity_regions.push(MaxVelocityRegion {
            min_corner_m: [1.0, -1.0],
            max_corner_m: [3.0, 1.0],
            max_speed_ms: 0.5,
        });
        let slow = generate(
            &[
                Waypoint::from(Pose2::new(0.0, 0.0, 0.0)),
                Waypoint::from(Pose2::new(4.0, 0.0, 0.0)),
            ],
            &TrajConfig::new(params).unwrap(),
        )
        .unwrap();

        assert!(slow.total_time_s() > fast.total_time_s());
        for s in slow.profile_states() {
            if s.pose.x_m() >= 1.0 && s.pose.x_m() <= 3.0 {
                assert!(s.velocity_ms <= 0.5 + 1e-9);
            }
        }
    }

    /// Demands a stop everywhere and a minimum acceleration above the maximum
    struct Impossible;

    impl TrajConstraint for Impossible {
        fn max_velocity_ms(&self, point: &PathPoint) -> f64 {
            if point.path_length_m > 0.5 && point.path_length_m < 1.5 {
                0.0
            }
            else {
                f64::INFINITY
            }
        }

        fn accel_bounds(&self, point: &PathPoint, _speed_ms: f64) -> AccelBounds {
            if point.path_length_m > 0.5 && point.path_length_m < 1.5 {
                AccelBounds { min_mss: 1.0, max_mss: -1.0 }
            }
            else {
                AccelBounds::unlimited()
            }
        }
    }

    #[test]
    fn test_impossible_constraint_clamped() {
        let mut config = TrajConfig::new(Params::default()).unwrap();
        config.add_constraint(Impossible);

        let traj = generate(
            &[
                Waypoint::from(Pose2::new(0.0, 0.0, 0.0)),
                Waypoint::from(Pose2::new(2.0, 0.0, 0.0)),
            ],
            &config,
        )
        .unwrap();

        assert!(traj
            .warnings()
            .iter()
            .any(|w| matches!(w.kind, ConstraintWarningKind::SpeedBelowMinimum { .. })));
        assert!(traj.total_time_s().is_finite());
        assert_abs_diff_eq!(traj.final_pose().x_m(), 2.0, epsilon = 1e-9);

        // Shared read only between consumers
        let shared = Arc::new(traj);
        let other = Arc::clone(&shared);
        assert_eq!(shared.states().len(), other.states().len());
    }
}
