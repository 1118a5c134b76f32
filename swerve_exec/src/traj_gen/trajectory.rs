//! Timed trajectory and its samples

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::ConstraintWarning;
use crate::geom::Pose2;
use crate::kinematics::ChassisVelocity;
use util::maths::{lerp, lerp_angle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state of the robot at one instant of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TrajectoryState {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Position of the robot and its heading (the way the robot faces, not
    /// the way it moves).
    pub pose: Pose2,

    /// Direction of the path at this point. For a reversed trajectory this
    /// points opposite to the direction of motion.
    ///
    /// Units: radians
    pub course_rad: f64,

    /// Speed along the course, negative for a reversed trajectory.
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Acceleration along the course from this state to the next.
    ///
    /// Units: meters/second^2
    pub accel_mss: f64,

    /// Rate of change of the robot heading.
    ///
    /// Units: radians/second
    pub omega_rads: f64,

    /// Units: 1/meters
    pub curvature_radpm: f64,

    /// Distance travelled along the path since the start.
    ///
    /// Units: meters
    pub path_length_m: f64,
}

/// A generated trajectory.
///
/// The trajectory holds both the profile states (one per path point, unevenly
/// spaced in time) and the states resampled at the fixed sample period.
#[derive(Debug, Clone, Serialize)]
pub struct Trajectory {
    profile: Vec<TrajectoryState>,

    samples: Vec<TrajectoryState>,

    /// Units: seconds
    sample_period_s: f64,

    warnings: Vec<ConstraintWarning>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectoryState {
    /// Velocity of the robot in the field frame.
    ///
    /// Units: meters/second
    pub fn field_velocity_ms(&self) -> Vector2<f64> {
        let (s, c) = self.course_rad.sin_cos();
        Vector2::new(self.velocity_ms * c, self.velocity_ms * s)
    }

    /// Velocity of the robot expressed in its own frame, i.e. the feedforward
    /// command for this state.
    pub fn chassis_velocity(&self) -> ChassisVelocity {
        let v = self.field_velocity_ms();
        ChassisVelocity::from_field_relative(v.x, v.y, self.omega_rads, self.pose.heading_rad)
    }

    /// Interpolate towards `end` at time `time_s`, assuming constant
    /// acceleration between the two states.
    fn interpolate(&self, end: &TrajectoryState, time_s: f64) -> TrajectoryState {
        let dt = time_s - self.time_s;
        if dt <= 0.0 {
            return *self;
        }

        let velocity_ms = self.velocity_ms + self.accel_mss * dt;
        let dist_m = (self.velocity_ms * dt + 0.5 * self.accel_mss * dt * dt).abs();

        let seg_len_m = end.path_length_m - self.path_length_m;
        let frac = if seg_len_m > 0.0 {
            (dist_m / seg_len_m).clamp(0.0, 1.0)
        }
        else {
            (dt / (end.time_s - self.time_s)).clamp(0.0, 1.0)
        };

        TrajectoryState {
            time_s,
            pose: self.pose.interpolate(&end.pose, frac),
            course_rad: lerp_angle(self.course_rad, end.course_rad, frac),
            velocity_ms,
            accel_mss: self.accel_mss,
            omega_rads: lerp(self.omega_rads, end.omega_rads, frac),
            curvature_radpm: lerp(self.curvature_radpm, end.curvature_radpm, frac),
            path_length_m: self.path_length_m + frac * seg_len_m,
        }
    }
}

impl Trajectory {
    /// Build a trajectory from its profile, resampling at `sample_period_s`.
    ///
    /// The samples are at `k * sample_period_s` for every `k` up to the first
    /// sample at or after the end of the profile. That last sample holds the
    /// final profile state with its time set to the sample time.
    pub(crate) fn new(
        profile: Vec<TrajectoryState>,
        sample_period_s: f64,
        warnings: Vec<ConstraintWarning>,
    ) -> Self {
        let mut traj = Self {
            profile,
            samples: Vec::new(),
            sample_period_s,
            warnings,
        };

        let total_s = traj.total_time_s();
        let num_periods = ((total_s / sample_period_s) - 1e-9).ceil().max(0.0) as usize;

        traj.samples = (0..=num_periods)
            .map(|k| {
                let t = k as f64 * sample_period_s;
                let mut s = traj.sample(t);
                s.time_s = t;
                s
            })
            .collect();

        traj
    }

    /// The state at time `time_s`. Times before the start give the first
    /// state and times after the end give the final state.
    pub fn sample(&self, time_s: f64) -> TrajectoryState {
        let (first, last) = match (self.profile.first(), self.profile.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return TrajectoryState::default(),
        };

        if time_s <= first.time_s {
            return *first;
        }
        if time_s >= last.time_s {
            return *last;
        }

        // First state after the requested time
        let idx = self.profile.partition_point(|s| s.time_s <= time_s);
        let start = &self.profile[idx - 1];
        let end = &self.profile[idx];

        start.interpolate(end, time_s)
    }

    /// The states at the fixed sample period, strictly increasing in time.
    pub fn states(&self) -> &[TrajectoryState] {
        &self.samples
    }

    /// The unevenly spaced states of the underlying speed profile.
    pub fn profile_states(&self) -> &[TrajectoryState] {
        &self.profile
    }

    /// Units: seconds
    pub fn sample_period_s(&self) -> f64 {
        self.sample_period_s
    }

    /// Duration of the trajectory.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        self.profile.last().map(|s| s.time_s).unwrap_or(0.0)
    }

    /// Length of the path.
    ///
    /// Units: meters
    pub fn path_length_m(&self) -> f64 {
        self.profile.last().map(|s| s.path_length_m).unwrap_or(0.0)
    }

    pub fn initial_pose(&self) -> Pose2 {
        self.profile.first().map(|s| s.pose).unwrap_or_default()
    }

    pub fn final_pose(&self) -> Pose2 {
        self.profile.last().map(|s| s.pose).unwrap_or_default()
    }

    /// Points where the constraints had to be clamped.
    pub fn warnings(&self) -> &[ConstraintWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 1 m straight line, accelerating at 2 m/s^2 for 0.5 s then
    /// decelerating.
    fn triangle_profile() -> Vec<TrajectoryState> {
        vec![
            TrajectoryState {
                time_s: 0.0,
                pose: Pose2::new(0.0, 0.0, 0.0),
                velocity_ms: 0.0,
                accel_mss: 4.0,
                path_length_m: 0.0,
                ..Default::default()
            },
            TrajectoryState {
                time_s: 0.5,
                pose: Pose2::new(0.5, 0.0, 0.0),
                velocity_ms: 2.0,
                accel_mss: -4.0,
                path_length_m: 0.5,
                ..Default::default()
            },
            TrajectoryState {
                time_s: 1.0,
                pose: Pose2::new(1.0, 0.0, 0.0),
                velocity_ms: 0.0,
                accel_mss: -4.0,
                path_length_m: 1.0,
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_sample_interpolates_constant_accel() {
        let traj = Trajectory::new(triangle_profile(), 0.02, Vec::new());

        let s = traj.sample(0.25);
        assert_abs_diff_eq!(s.velocity_ms, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.pose.x_m(), 0.125, epsilon = 1e-12);

        let s = traj.sample(0.75);
        assert_abs_diff_eq!(s.velocity_ms, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.pose.x_m(), 0.875, epsilon = 1e-12);

        // Clamped outside the trajectory
        assert_eq!(traj.sample(-1.0), triangle_profile()[0]);
        assert_eq!(traj.sample(5.0), triangle_profile()[2]);
    }

    #[test]
    fn test_resampling() {
        let traj = Trajectory::new(triangle_profile(), 0.3, Vec::new());
        let states = traj.states();

        // 0, 0.3, 0.6, 0.9 and 1.2, the last clamped to the end state
        assert_eq!(states.len(), 5);
        for (k, s) in states.iter().enumerate() {
            assert_abs_diff_eq!(s.time_s, 0.3 * k as f64, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(states[4].pose.x_m(), 1.0);
        assert_abs_diff_eq!(states[4].velocity_ms, 0.0);

        // Exact multiple of the period has no extra sample
        let traj = Trajectory::new(triangle_profile(), 0.25, Vec::new());
        assert_eq!(traj.states().len(), 5);
        assert_abs_diff_eq!(traj.states()[4].time_s, 1.0, epsilon = 1e-12);
    }
}
