//! Trajectory follower state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{FollowControllers, Params};
use crate::drive_params::ConfigError;
use crate::geom::Pose2;
use crate::kinematics::ChassisVelocity;
use crate::traj_gen::Trajectory;
use util::{maths::get_ang_dist, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a trajectory one sample per control cycle.
pub struct TrajFollower {
    params: Params,

    /// Executing mode
    mode: TrajFollowMode,

    /// The trajectory being followed.
    traj: Option<Arc<Trajectory>>,

    /// Index of the next sample to consume
    index: usize,

    /// Controller objects used to correct the tracking errors
    controllers: FollowControllers,

    report: StatusReport,
}

/// Input data to the follower.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Current estimate of the robot pose in the field frame.
    pub pose: Pose2,
}

/// The status report containing the tracking errors of the last cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Index of the sample used this cycle.
    pub sample_index: usize,

    /// Trajectory time of the sample used this cycle.
    ///
    /// Units: seconds
    pub sample_time_s: f64,

    /// Distance the robot is ahead of the sample along the course.
    ///
    /// Units: meters
    pub along_track_error_m: f64,

    /// Distance the robot is to the left of the course.
    ///
    /// Units: meters
    pub cross_track_error_m: f64,

    /// Angle the robot heading is anticlockwise of the sample heading.
    ///
    /// Units: radians
    pub head_error_rad: f64,

    /// If true the limit on the cross track error has been exceeded
    pub cross_track_limit_exceeded: bool,

    /// If true the limit on the heading error has been exceeded
    pub head_limit_exceeded: bool,

    /// True on the cycle the last sample was consumed.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur when following a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajFollowError {
    /// A trajectory is already loaded. This error occurs when attempting to
    /// start a new trajectory before the current one has finished.
    #[error("Attempted to begin a trajectory while one is already being followed")]
    TrajectoryAlreadyLoaded,

    #[error("Attempted to begin an empty trajectory")]
    EmptyTrajectory,

    #[error("The current pose is not finite: {0:?}")]
    NonFinitePose(Pose2),
}

/// The possible modes of execution of the follower.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TrajFollowMode {
    Off,
    Following,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajFollower {
    /// Create a new follower with no trajectory loaded.
    pub fn new(params: Params) -> Result<Self, ConfigError> {
        params.validate()?;

        let controllers = FollowControllers::new(&params);

        Ok(Self {
            params,
            mode: TrajFollowMode::Off,
            traj: None,
            index: 0,
            controllers,
            report: StatusReport::default(),
        })
    }

    pub fn mode(&self) -> TrajFollowMode {
        self.mode
    }

    /// The trajectory currently being followed, if any.
    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.traj.as_ref()
    }

    /// Number of samples left to consume.
    pub fn remaining(&self) -> usize {
        self.traj
            .as_ref()
            .map(|t| t.states().len().saturating_sub(self.index))
            .unwrap_or(0)
    }

    /// Begin following a trajectory. The first sample is consumed on the next
    /// call to `next_cmd`.
    ///
    /// Loading a new trajectory before the current one has finished is an
    /// error, call `abort` first.
    pub fn begin(&mut self, traj: Arc<Trajectory>) -> Result<(), TrajFollowError> {
        if self.traj.is_some() {
            return Err(TrajFollowError::TrajectoryAlreadyLoaded);
        }
        if traj.states().is_empty() {
            return Err(TrajFollowError::EmptyTrajectory);
        }

        info!(
            "Following trajectory of {} samples ({:.2} s)",
            traj.states().len(),
            traj.total_time_s()
        );

        self.traj = Some(traj);
        self.index = 0;
        self.controllers.reset();
        self.mode = TrajFollowMode::Following;

        Ok(())
    }

    /// Stop following the current trajectory. Has no effect if none is
    /// loaded.
    pub fn abort(&mut self) {
        if self.traj.take().is_some() {
            info!("Trajectory following aborted after {} samples", self.index);
        }
        self.mode = TrajFollowMode::Off;
    }

    /// Consume the next sample and compute the robot frame velocity command.
    ///
    /// Returns `None` if no trajectory is being followed, including once all
    /// samples have been consumed.
    pub fn next_cmd(&mut self, pose: &Pose2) -> Result<Option<ChassisVelocity>, TrajFollowError> {
        self.report = StatusReport::default();

        let traj = match self.mode {
            TrajFollowMode::Off => return Ok(None),
            TrajFollowMode::Following => match self.traj {
                Some(ref t) => Arc::clone(t),
                None => {
                    self.mode = TrajFollowMode::Off;
                    return Ok(None);
                }
            },
        };

        if !pose.x_m().is_finite() || !pose.y_m().is_finite() || !pose.heading_rad.is_finite() {
            return Err(TrajFollowError::NonFinitePose(*pose));
        }

        let sample = match traj.states().get(self.index) {
            Some(s) => *s,
            None => {
                self.abort();
                return Ok(None);
            }
        };
        self.report.sample_index = self.index;
        self.report.sample_time_s = sample.time_s;
        self.index += 1;

        let dt_s = traj.sample_period_s();

        // Tracking errors, target minus actual in the field frame
        let pos_error_m = sample.pose.position_m - pose.position_m;
        let head_error_rad = get_ang_dist(pose.heading_rad, sample.pose.heading_rad);

        // Report the errors relative to the course, as robot minus target
        let course_error_m = Rotation2::new(-sample.course_rad) * -pos_error_m;
        self.report.along_track_error_m = course_error_m.x;
        self.report.cross_track_error_m = course_error_m.y;
        self.report.head_error_rad = -head_error_rad;

        if course_error_m.y.abs() > self.params.cross_track_error_limit_m {
            self.report.cross_track_limit_exceeded = true;
            warn!("Cross track error limit exceeded: {:.3} m", course_error_m.y);
        }
        if head_error_rad.abs() > self.params.head_error_limit_rad {
            self.report.head_limit_exceeded = true;
            warn!("Heading error limit exceeded: {:.3} rad", -head_error_rad);
        }

        // Feedforward plus correction, in the field frame
        let field_vel_ms: Vector2<f64> =
            sample.field_velocity_ms() + self.controllers.pos_correction_ms(&pos_error_m, dt_s);
        let omega_rads =
            sample.omega_rads + self.controllers.head_correction_rads(head_error_rad, dt_s);

        let cmd = ChassisVelocity::from_field_relative(
            field_vel_ms.x,
            field_vel_ms.y,
            omega_rads,
            pose.heading_rad,
        );

        if self.index >= traj.states().len() {
            debug!("Last trajectory sample consumed");
            self.report.finished = true;
            self.traj = None;
            self.mode = TrajFollowMode::Off;
        }

        Ok(Some(cmd))
    }
}

impl State for TrajFollower {
    type InputData = InputData;
    type OutputData = Option<ChassisVelocity>;
    type StatusReport = StatusReport;
    type ProcError = TrajFollowError;

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let cmd = self.next_cmd(&input_data.pose)?;
        Ok((cmd, self.report))
    }
}
