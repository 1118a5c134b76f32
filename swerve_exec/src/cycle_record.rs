//! Per-cycle archive of the control loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use swerve_lib::{
    drive_params::{ModuleArray, ModuleId},
    geom::Pose2,
    kinematics::{ChassisVelocity, ModuleState},
    traj_gen::TrajectoryState,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Archives one row per control cycle.
pub struct CycleArchive {
    arch: Archiver,

    pub record: CycleRecord,
}

/// Everything that happened in one control cycle, flattened for CSV.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleRecord {
    pub session_time_s: f64,
    pub cycle: u64,
    pub disabled: bool,

    pub traj_time_s: f64,
    pub traj_x_m: f64,
    pub traj_y_m: f64,
    pub traj_head_rad: f64,
    pub traj_speed_ms: f64,

    pub cmd_vx_ms: f64,
    pub cmd_vy_ms: f64,
    pub cmd_omega_rads: f64,
    pub cmd_clamped: bool,
    pub desaturated: bool,

    pub fl_speed_ms: f64,
    pub fl_angle_rad: f64,
    pub fr_speed_ms: f64,
    pub fr_angle_rad: f64,
    pub bl_speed_ms: f64,
    pub bl_angle_rad: f64,
    pub br_speed_ms: f64,
    pub br_angle_rad: f64,

    pub sim_x_m: f64,
    pub sim_y_m: f64,
    pub sim_head_rad: f64,

    pub odom_x_m: f64,
    pub odom_y_m: f64,
    pub odom_head_rad: f64,

    pub cross_track_error_m: f64,
    pub head_error_rad: f64,

    pub battery_v: f64,
    pub total_current_a: f64,
    pub browned_out: bool,
    pub brownout_substeps: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleArchive {
    /// Create a new archive in the session's archive directory.
    pub fn new(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch: Archiver::from_path(session, "cycles.csv")?,
            record: CycleRecord::default(),
        })
    }
}

impl Archived for CycleArchive {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch.serialise(&self.record)
    }
}

impl CycleRecord {
    /// Start the record for a new cycle.
    pub fn new(cycle: u64, disabled: bool) -> Self {
        Self {
            session_time_s: session::get_elapsed_seconds(),
            cycle,
            disabled,
            ..Default::default()
        }
    }

    pub fn set_traj(&mut self, sample: &TrajectoryState) {
        self.traj_time_s = sample.time_s;
        self.traj_x_m = sample.pose.x_m();
        self.traj_y_m = sample.pose.y_m();
        self.traj_head_rad = sample.pose.heading_rad;
        self.traj_speed_ms = sample.velocity_ms;
    }

    pub fn set_cmd(&mut self, cmd: &ChassisVelocity, clamped: bool) {
        self.cmd_vx_ms = cmd.vx_ms;
        self.cmd_vy_ms = cmd.vy_ms;
        self.cmd_omega_rads = cmd.omega_rads;
        self.cmd_clamped = clamped;
    }

    pub fn set_module_states(&mut self, states: &ModuleArray<ModuleState>) {
        for id in ModuleId::ALL.iter() {
            let s = states[id.index()];
            let (speed, angle) = match id {
                ModuleId::FrontLeft => (&mut self.fl_speed_ms, &mut self.fl_angle_rad),
                ModuleId::FrontRight => (&mut self.fr_speed_ms, &mut self.fr_angle_rad),
                ModuleId::BackLeft => (&mut self.bl_speed_ms, &mut self.bl_angle_rad),
                ModuleId::BackRight => (&mut self.br_speed_ms, &mut self.br_angle_rad),
            };
            *speed = s.speed_ms;
            *angle = s.angle_rad;
        }
    }

    pub fn set_sim_pose(&mut self, pose: &Pose2) {
        self.sim_x_m = pose.x_m();
        self.sim_y_m = pose.y_m();
        self.sim_head_rad = pose.heading_rad;
    }

    pub fn set_odom_pose(&mut self, pose: &Pose2) {
        self.odom_x_m = pose.x_m();
        self.odom_y_m = pose.y_m();
        self.odom_head_rad = pose.heading_rad;
    }
}
