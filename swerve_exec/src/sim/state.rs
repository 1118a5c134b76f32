//! Simulation state and stepping

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    Battery, DcMotor, Drivetrain, ModuleConfig, Params, RigidBody,
    SimDriveController, SimError, SimPowerState, SimSteerController, SteerController,
    SwerveModule,
};
use crate::drive_params::{self, ConfigError, ModuleArray, ModuleGeometry, ModuleId, NUM_MODULES};
use crate::geom::Pose2;
use crate::kinematics::ModuleState;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simulated swerve module.
pub type SimModule = SwerveModule<SimDriveController, SimSteerController>;

/// The simulated robot.
#[derive(Debug, Clone)]
pub struct SwerveSim {
    drive_params: drive_params::Params,

    num_sub_steps: u64,

    drivetrain: Drivetrain,

    body: RigidBody,

    modules: ModuleArray<SimModule>,

    battery: Battery,

    /// Browned out state of the most recent sub-step.
    browned_out: bool,

    /// True if any sub-step of the last control cycle was browned out.
    browned_out_last_step: bool,

    /// Distance rolled by each wheel since the last reset.
    ///
    /// Units: meters
    wheel_dist_m: ModuleArray<f64>,

    /// Drive encoder counts at the end of the last step.
    prev_drive_counts: ModuleArray<i64>,
}

/// Input data to the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputData {
    pub cmd: SimCommand,

    /// Set when the robot is disabled. No voltage reaches the motors.
    pub is_disabled: bool,
}

/// Output of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    /// True pose of the robot.
    pub pose: Pose2,

    pub power: SimPowerState,

    /// Module states read through the (quantised) module encoders over the
    /// last control cycle.
    pub measured_states: ModuleArray<ModuleState>,

    /// Heading read by the gyro.
    ///
    /// Units: radians
    pub gyro_rad: f64,
}

/// Record of a single sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubStepRecord {
    /// Battery voltage was below the threshold at the start of the sub-step.
    pub browned_out: bool,

    /// No voltage was applied in this sub-step.
    pub disabled: bool,

    /// Units: volts
    pub start_voltage_v: f64,

    /// Units: volts
    pub end_voltage_v: f64,

    /// Units: amps
    pub total_current_a: f64,

    /// Units: volts
    pub drive_voltages_v: ModuleArray<f64>,

    /// Units: volts
    pub steer_voltages_v: ModuleArray<f64>,

    /// Module states the applied voltages correspond to.
    pub effective_states: ModuleArray<ModuleState>,
}

/// Status report for one simulation step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub sub_steps: Vec<SubStepRecord>,

    /// The robot browned out during this step, having not in the last.
    pub brownout_entered: bool,

    /// The robot did not brown out during this step, having in the last.
    pub brownout_cleared: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Command for the simulated modules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SimCommand {
    /// Module states, converted to drive voltages and steer angles by each
    /// module.
    States(ModuleArray<ModuleState>),

    /// Raw drive voltages and steer angles.
    Voltages {
        drive_v: ModuleArray<f64>,
        steer_angle_rad: ModuleArray<f64>,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveSim {
    /// Create a simulation with the robot at rest at the default start pose.
    pub fn new(drive_params: &drive_params::Params, params: &Params) -> Result<Self, ConfigError> {
        drive_params.validate()?;
        params.validate()?;

        let geom = ModuleGeometry::from_params(drive_params)?;

        let drive_motor = DcMotor::new(&params.drive_motor);
        let steer_motor = DcMotor::new(&params.steer_motor);

        let make_module = || {
            let drive = SimDriveController::new(
                drive_motor,
                params.drive_reduction,
                drive_params.wheel_radius_m,
            );
            let config = ModuleConfig {
                drive_volts_per_ms: params.max_command_voltage_v
                    / drive.free_speed_ms(params.max_command_voltage_v),
                max_voltage_v: params.max_command_voltage_v,
            };
            let steer = SimSteerController::new(
                steer_motor,
                params.steer_reduction,
                params.steer_moi_kgm2,
                params.steer_k_p,
            );

            SwerveModule::new(drive, steer, config)
        };

        Ok(Self {
            drive_params: drive_params.clone(),
            num_sub_steps: drive_params.num_sim_sub_steps(),
            drivetrain: Drivetrain::new(drive_params, params, &geom),
            body: RigidBody::at_rest(drive_params.default_start_pose),
            modules: [make_module(), make_module(), make_module(), make_module()],
            battery: Battery::new(params.battery.clone()),
            browned_out: false,
            browned_out_last_step: false,
            wheel_dist_m: [0.0; NUM_MODULES],
            prev_drive_counts: [0; NUM_MODULES],
        })
    }

    /// Place the robot at rest at `pose`, with the modules pointing forwards
    /// and the battery back at its nominal voltage.
    pub fn reset(&mut self, pose: Pose2) {
        self.body = RigidBody::at_rest(pose);

        for module in self.modules.iter_mut() {
            module.drive_mut().reset();
            module.steer_mut().reset(0.0);
        }

        self.battery.reset();
        self.browned_out = false;
        self.browned_out_last_step = false;
        self.wheel_dist_m = [0.0; NUM_MODULES];
        self.prev_drive_counts = [0; NUM_MODULES];

        info!("Simulation reset to {:?}", pose);
    }

    pub fn pose(&self) -> Pose2 {
        self.body.pose
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    pub fn modules(&self) -> &ModuleArray<SimModule> {
        &self.modules
    }

    pub fn power_state(&self) -> SimPowerState {
        self.battery.power_state(self.browned_out, 0)
    }

    /// Advance the simulation by one control period.
    ///
    /// Brownout is checked at the start of every sub-step and does not latch:
    /// a sub-step that begins browned out runs disabled, and once the battery
    /// voltage recovers the next sub-step is driven again, within the same
    /// control period.
    pub fn step(
        &mut self,
        cmd: &SimCommand,
        is_disabled: bool,
    ) -> Result<(OutputData, StatusReport), SimError> {
        check_command(cmd)?;

        for id in ModuleId::ALL.iter() {
            let i = id.index();
            match cmd {
                SimCommand::States(states) => self.modules[i].set_state(&states[i]),
                SimCommand::Voltages {
                    drive_v,
                    steer_angle_rad,
                } => self.modules[i].set(drive_v[i], steer_angle_rad[i]),
            }
        }

        let mut report = StatusReport {
            sub_steps: Vec::with_capacity(self.num_sub_steps as usize),
            ..Default::default()
        };

        for _ in 0..self.num_sub_steps {
            let record = self.sub_step(is_disabled);
            report.sub_steps.push(record);
        }

        let brownout_substeps = report.sub_steps.iter().filter(|r| r.browned_out).count() as u64;
        let power = self.battery.power_state(self.browned_out, brownout_substeps);

        if brownout_substeps > 0 && !self.browned_out_last_step {
            report.brownout_entered = true;
            warn!(
                "Brownout: {} of {} sub-steps below threshold, battery at {:.2} V drawing {:.1} A",
                brownout_substeps, self.num_sub_steps, power.terminal_voltage_v, power.total_current_a
            );
        }
        else if brownout_substeps == 0 && self.browned_out_last_step {
            report.brownout_cleared = true;
            info!("Brownout cleared, battery at {:.2} V", power.terminal_voltage_v);
        }
        self.browned_out_last_step = brownout_substeps > 0;

        let output = OutputData {
            pose: self.body.pose,
            power,
            measured_states: self.read_encoders(),
            gyro_rad: self.body.pose.heading_rad,
        };

        trace!(
            "Sim pose ({:.3}, {:.3}, {:.3}), battery {:.2} V",
            output.pose.x_m(),
            output.pose.y_m(),
            output.pose.heading_rad,
            power.terminal_voltage_v
        );

        Ok((output, report))
    }

    /// Advance the robot and battery by one sub-step.
    fn sub_step(&mut self, is_disabled: bool) -> SubStepRecord {
        let dt_s = self.drive_params.sim_period_s;
        let supply_v = self.battery.terminal_voltage_v();

        self.browned_out = self.battery.is_browned_out();
        let disabled = is_disabled || self.browned_out;

        let mut steer_angles_rad = [0.0; NUM_MODULES];
        for (angle, module) in steer_angles_rad.iter_mut().zip(self.modules.iter()) {
            *angle = module.steer().get_state_angle();
        }
        let rolling_ms = self.drivetrain.rolling_speeds_ms(&self.body, &steer_angles_rad);

        let mut drive_forces_n = [0.0; NUM_MODULES];
        let mut drive_voltages_v = [0.0; NUM_MODULES];
        let mut steer_voltages_v = [0.0; NUM_MODULES];
        let mut effective_states = [ModuleState::default(); NUM_MODULES];
        let mut load_a = 0.0;

        for (i, module) in self.modules.iter_mut().enumerate() {
            self.wheel_dist_m[i] += rolling_ms[i] * dt_s;

            let (drive_v, steer_v) = if disabled {
                (0.0, 0.0)
            }
            else {
                (
                    module.drive().reference_voltage_v().clamp(-supply_v, supply_v),
                    module.steer().control_voltage_v(supply_v),
                )
            };

            let drive = module.drive_mut();
            drive.set_velocity_ms(rolling_ms[i]);
            let drive_a = drive.current_a(drive_v);
            drive_forces_n[i] = drive.force_n(drive_a);

            let steer_a = module.steer_mut().advance(steer_v, dt_s);

            // Motor controllers draw the motor current times their duty cycle
            if supply_v > 0.0 {
                load_a += ((drive_a * drive_v).abs() + (steer_a * steer_v).abs()) / supply_v;
            }

            drive_voltages_v[i] = drive_v;
            steer_voltages_v[i] = steer_v;
            effective_states[i] = ModuleState::new(
                drive_v / module.config().drive_volts_per_ms,
                module.steer().reference_angle_rad(),
            );
        }

        self.drivetrain
            .advance(&mut self.body, &steer_angles_rad, &drive_forces_n, dt_s);
        self.battery.update(load_a);

        SubStepRecord {
            browned_out: self.browned_out,
            disabled,
            start_voltage_v: supply_v,
            end_voltage_v: self.battery.terminal_voltage_v(),
            total_current_a: self.battery.total_current_a(),
            drive_voltages_v,
            steer_voltages_v,
            effective_states,
        }
    }

    /// Module states as read by the encoders over the last control period.
    fn read_encoders(&mut self) -> ModuleArray<ModuleState> {
        let mut states = [ModuleState::default(); NUM_MODULES];

        for (i, state) in states.iter_mut().enumerate() {
            let counts = self.drive_params.m_to_drive_counts(self.wheel_dist_m[i]);
            let speed_ms = self
                .drive_params
                .drive_counts_to_m(counts - self.prev_drive_counts[i])
                / self.drive_params.ctrl_period_s;
            self.prev_drive_counts[i] = counts;

            let angle_rad = self.drive_params.steer_counts_to_rad(
                self.drive_params
                    .rad_to_steer_counts(self.modules[i].steer().get_state_angle()),
            );

            *state = ModuleState::new(speed_ms, angle_rad);
        }

        states
    }
}

impl State for SwerveSim {
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = SimError;

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.step(&input_data.cmd, input_data.is_disabled)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_command(cmd: &SimCommand) -> Result<(), SimError> {
    for id in ModuleId::ALL.iter() {
        let i = id.index();
        let finite = match cmd {
            SimCommand::States(states) => {
                states[i].speed_ms.is_finite() && states[i].angle_rad.is_finite()
            }
            SimCommand::Voltages {
                drive_v,
                steer_angle_rad,
            } => drive_v[i].is_finite() && steer_angle_rad[i].is_finite(),
        };

        if !finite {
            return Err(SimError::NonFiniteCommand(id.short_name()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sim() -> SwerveSim {
        let mut sim =
            SwerveSim::new(&drive_params::Params::default(), &Params::default()).unwrap();
        sim.reset(Pose2::new(5.0, 5.0, 0.0));
        sim
    }

    fn full_voltage() -> SimCommand {
        SimCommand::Voltages {
            drive_v: [12.0; NUM_MODULES],
            steer_angle_rad: [0.0; NUM_MODULES],
        }
    }

    #[test]
    fn test_quiescent_draw() {
        let mut sim = sim();

        let (out, report) = sim
            .step(&SimCommand::States([ModuleState::default(); NUM_MODULES]), true)
            .unwrap();

        assert_abs_diff_eq!(out.power.terminal_voltage_v, 13.12, epsilon = 1e-9);
        assert_abs_diff_eq!(out.power.total_current_a, 2.0, epsilon = 1e-9);
        assert!(!out.power.browned_out);
        assert_eq!(out.power.brownout_substeps, 0);
        assert_eq!(report.sub_steps.len(), 20);
        assert!(report.sub_steps.iter().all(|r| r.disabled && !r.browned_out));
        assert_abs_diff_eq!(out.pose.x_m(), 5.0);
    }

    #[test]
    fn test_brownout_forces_disable() {
        let mut sim = sim();

        let (out, report) = sim.step(&full_voltage(), false).unwrap();
        let subs = &report.sub_steps;

        // The first sub-step starts on a fresh battery and pulls it down
        assert!(!subs[0].browned_out);
        assert!(!subs[0].disabled);
        assert_abs_diff_eq!(subs[0].start_voltage_v, 13.2);
        assert!(subs[0].end_voltage_v < 6.5);

        // So the next one is browned out with nothing applied
        assert!(subs[1].browned_out);
        assert!(subs[1].disabled);
        for i in 0..NUM_MODULES {
            assert_abs_diff_eq!(subs[1].drive_voltages_v[i], 0.0);
            assert_abs_diff_eq!(subs[1].effective_states[i].speed_ms, 0.0);
        }
        assert_abs_diff_eq!(subs[1].end_voltage_v, 13.12, epsilon = 1e-9);

        // Recovered by the following sub-step, which is driven again
        assert!(!subs[2].browned_out);
        assert!(!subs[2].disabled);
        assert!(subs[2].drive_voltages_v.iter().all(|v| v.abs() > 0.0));

        // No hysteresis, so it alternates
        for (k, sub) in subs.iter().enumerate() {
            assert_eq!(sub.browned_out, k % 2 == 1);
            assert_eq!(sub.disabled, k % 2 == 1);
        }
        assert_eq!(out.power.brownout_substeps, 10);
        assert!(report.brownout_entered);

        // Still moved forwards in the powered sub-steps
        assert!(out.pose.x_m() > 5.0);
    }

    #[test]
    fn test_brownout_deterministic() {
        let mut a = sim();
        let mut b = sim();

        for _ in 0..5 {
            let (out_a, rep_a) = a.step(&full_voltage(), false).unwrap();
            let (out_b, rep_b) = b.step(&full_voltage(), false).unwrap();

            assert_eq!(out_a, out_b);
            assert_eq!(rep_a.sub_steps, rep_b.sub_steps);
        }

        // Reset restores the battery
        a.reset(Pose2::new(5.0, 5.0, 0.0));
        assert_abs_diff_eq!(a.power_state().terminal_voltage_v, 13.2);
        assert!(!a.power_state().browned_out);
    }

    #[test]
    fn test_drive_forwards() {
        let mut sim = sim();
        let cmd = SimCommand::States([ModuleState::new(1.0, 0.0); NUM_MODULES]);

        let mut out = None;
        for _ in 0..50 {
            let (o, report) = sim.step(&cmd, false).unwrap();
            assert!(report.sub_steps.iter().all(|r| !r.browned_out));
            out = Some(o);
        }
        let out = out.unwrap();

        assert!(out.pose.x_m() > 5.5);
        assert_abs_diff_eq!(out.pose.y_m(), 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.gyro_rad, 0.0, epsilon = 1e-6);
        for state in out.measured_states.iter() {
            assert_abs_diff_eq!(state.speed_ms, 1.0, epsilon = 0.1);
            assert_abs_diff_eq!(state.angle_rad, 0.0, epsilon = 1e-9);
        }
        assert!(out.power.terminal_voltage_v > 12.0);
    }

    #[test]
    fn test_states_reverse_drive() {
        let mut sim = sim();

        // Modules start facing forwards, so backwards is a reversed drive
        let cmd = SimCommand::States([ModuleState::new(1.0, std::f64::consts::PI); NUM_MODULES]);
        let (_, report) = sim.step(&cmd, false).unwrap();

        for v in report.sub_steps[0].drive_voltages_v.iter() {
            assert!(*v < 0.0);
        }
        for s in report.sub_steps[0].effective_states.iter() {
            assert_abs_diff_eq!(s.speed_ms, 1.0, epsilon = 1e-9);
            assert_abs_diff_eq!(s.angle_rad.abs(), std::f64::consts::PI, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid() {
        let mut sim = sim();
        let mut states = [ModuleState::default(); NUM_MODULES];
        states[2].speed_ms = f64::NAN;

        assert!(matches!(
            sim.step(&SimCommand::States(states), false),
            Err(SimError::NonFiniteCommand(_))
        ));

        let mut sim_params = Params::default();
        sim_params.battery.internal_resistance_ohm = -0.1;
        assert!(SwerveSim::new(&drive_params::Params::default(), &sim_params).is_err());
    }
}
