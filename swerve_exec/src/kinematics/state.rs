//! Implementation of the swerve kinematics solver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{SMatrix, Vector2};
use serde::Serialize;

// Internal
use super::{ChassisVelocity, KinematicsError, ModuleState, ANGLE_HOLD_SPEED_MS};
use crate::drive_params::{
    check_positive, ConfigError, ModuleArray, ModuleGeometry, ModuleId, Params, NUM_MODULES,
};
use util::module::State;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Two velocity components (x and y) per module.
const NUM_VEL_COMPONENTS: usize = 2 * NUM_MODULES;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics solver for a four module swerve drive.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    geom: ModuleGeometry,

    /// Speed limit applied to every module by desaturation.
    ///
    /// Units: meters/second
    max_module_speed_ms: f64,

    /// Least squares solution matrix mapping the stacked module velocity
    /// components `[v0x, v0y, v1x, ...]` onto `[vx, vy, omega]`.
    fwd_mat: SMatrix<f64, 3, NUM_VEL_COMPONENTS>,

    /// The last states produced, used to hold the angle of stopped modules.
    prev_states: ModuleArray<ModuleState>,
}

/// Input data to the kinematics solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Demanded chassis velocity.
    pub cmd: ChassisVelocity,

    /// Point (in the robot frame) to rotate about. The robot centre is the
    /// origin.
    ///
    /// Units: meters
    pub cor_m: Vector2<f64>,
}

/// Status report for kinematics processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// True if the module speeds were scaled down to the limit.
    pub desaturated: bool,

    /// The factor the module speeds were multiplied by (1 if not desaturated).
    pub desat_scale: f64,

    /// True for modules whose angle was held because they are stopped.
    pub angle_held: ModuleArray<bool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Create a new solver from the drivetrain parameters.
    pub fn new(params: &Params) -> Result<Self, ConfigError> {
        params.validate()?;
        Self::from_geometry(ModuleGeometry::from_params(params)?, params.max_module_speed_ms)
    }

    /// Create a new solver for an arbitrary module layout.
    pub fn from_geometry(
        geom: ModuleGeometry,
        max_module_speed_ms: f64,
    ) -> Result<Self, ConfigError> {
        check_positive("max_module_speed_ms", max_module_speed_ms)?;

        // Each module contributes two rows: vx - omega * y and vy + omega * x
        let mut inv_mat = SMatrix::<f64, NUM_VEL_COMPONENTS, 3>::zeros();
        for (i, p) in geom.positions_m().iter().enumerate() {
            inv_mat[(2 * i, 0)] = 1.0;
            inv_mat[(2 * i, 2)] = -p.y;
            inv_mat[(2 * i + 1, 1)] = 1.0;
            inv_mat[(2 * i + 1, 2)] = p.x;
        }

        let fwd_mat = (inv_mat.transpose() * inv_mat)
            .try_inverse()
            .ok_or_else(|| {
                ConfigError::DegenerateGeometry(String::from(
                    "module layout cannot resolve chassis rotation",
                ))
            })?
            * inv_mat.transpose();

        Ok(Self {
            geom,
            max_module_speed_ms,
            fwd_mat,
            prev_states: [ModuleState::default(); NUM_MODULES],
        })
    }

    pub fn geometry(&self) -> &ModuleGeometry {
        &self.geom
    }

    pub fn max_module_speed_ms(&self) -> f64 {
        self.max_module_speed_ms
    }

    /// Forget the held module angles, e.g. after a pose reset.
    pub fn reset(&mut self, states: ModuleArray<ModuleState>) {
        self.prev_states = states;
    }

    /// Velocity vector of each module for the given command, before any
    /// angle hold or desaturation.
    ///
    /// Units: meters/second
    pub fn module_velocities(
        &self,
        cmd: &ChassisVelocity,
        cor_m: &Vector2<f64>,
    ) -> ModuleArray<Vector2<f64>> {
        let mut vels = [Vector2::zeros(); NUM_MODULES];

        for id in ModuleId::ALL.iter() {
            let r = self.geom.position_m(*id) - cor_m;
            vels[id.index()] = Vector2::new(
                cmd.vx_ms - cmd.omega_rads * r.y,
                cmd.vy_ms + cmd.omega_rads * r.x,
            );
        }

        vels
    }

    /// Speed of the fastest module for the given command, without
    /// desaturation.
    ///
    /// Units: meters/second
    pub fn max_raw_module_speed_ms(&self, cmd: &ChassisVelocity) -> f64 {
        self.module_velocities(cmd, &Vector2::zeros())
            .iter()
            .map(|v| v.norm())
            .fold(0f64, f64::max)
    }

    /// Compute the module states needed to achieve the given chassis
    /// velocity, rotating about `cor_m`.
    pub fn to_module_states(
        &mut self,
        cmd: &ChassisVelocity,
        cor_m: &Vector2<f64>,
    ) -> Result<(ModuleArray<ModuleState>, StatusReport), KinematicsError> {
        if !cmd.is_finite() {
            return Err(KinematicsError::NonFiniteCommand(*cmd));
        }
        if !cor_m.x.is_finite() || !cor_m.y.is_finite() {
            return Err(KinematicsError::NonFiniteCentreOfRotation(cor_m.x, cor_m.y));
        }

        let mut report = StatusReport {
            desat_scale: 1.0,
            ..Default::default()
        };
        let mut states = [ModuleState::default(); NUM_MODULES];

        for (i, vel) in self.module_velocities(cmd, cor_m).iter().enumerate() {
            states[i] = ModuleState::from_velocity(vel);

            if states[i].speed_ms < ANGLE_HOLD_SPEED_MS {
                states[i].angle_rad = self.prev_states[i].angle_rad;
                report.angle_held[i] = true;
            }
        }

        if let Some(scale) = desaturate(&mut states, self.max_module_speed_ms) {
            report.desaturated = true;
            report.desat_scale = scale;
            trace!("Module speeds desaturated by {:.4}", scale);
        }

        self.prev_states = states;

        Ok((states, report))
    }

    /// Best fit chassis velocity for the given module states.
    pub fn to_chassis_velocity(&self, states: &ModuleArray<ModuleState>) -> ChassisVelocity {
        let mut stacked = SMatrix::<f64, NUM_VEL_COMPONENTS, 1>::zeros();
        for (i, s) in states.iter().enumerate() {
            let v = s.velocity_ms();
            stacked[2 * i] = v.x;
            stacked[2 * i + 1] = v.y;
        }

        let chassis = self.fwd_mat * stacked;

        ChassisVelocity::new(chassis[0], chassis[1], chassis[2])
    }
}

impl State for SwerveKinematics {
    type InputData = InputData;
    type OutputData = ModuleArray<ModuleState>;
    type StatusReport = StatusReport;
    type ProcError = KinematicsError;

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.to_module_states(&input_data.cmd, &input_data.cor_m)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale all module speeds down by one common factor if any exceeds
/// `max_speed_ms`, so that the fastest module runs exactly at the limit.
///
/// Returns the factor applied, or `None` if no scaling was needed.
pub fn desaturate(states: &mut ModuleArray<ModuleState>, max_speed_ms: f64) -> Option<f64> {
    let fastest = states.iter().map(|s| s.speed_ms).fold(0f64, f64::max);

    if fastest <= max_speed_ms {
        return None;
    }

    let scale = max_speed_ms / fastest;
    for s in states.iter_mut() {
        s.speed_ms *= scale;
    }

    Some(scale)
}
