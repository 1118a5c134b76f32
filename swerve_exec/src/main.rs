//! Main swerve executable entry point.
//!
//! # Architecture
//!
//! The executable drives one trajectory on the simulated robot:
//!
//!     - Initialise all modules
//!     - Generate the trajectory for the selected routine
//!     - Main loop, once per control period:
//!         - Trajectory following against the odometry pose
//!         - Kinematics, chassis velocity to module states
//!         - Simulation step, in place of the hardware
//!         - Odometry from the measured module states and gyro
//!         - Archiving
//!
//! # Modules
//!
//! All cyclic modules (e.g. `kinematics`) shall provide a public struct
//! implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cycle_record;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use nalgebra::Vector2;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use cycle_record::{CycleArchive, CycleRecord};
use swerve_lib::{
    drive_params,
    kinematics::{self, ChassisVelocity, Odometry, SwerveKinematics},
    params::SwerveExecParams,
    sim::{self, SimCommand, SwerveSim},
    traj_follow::{self, TrajFollowMode, TrajFollower},
    traj_gen::{self, generate, TrajConfig},
};
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!("Running on: {}", host::get_host_desc());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;
    let drive_params: drive_params::Params =
        util::params::load("drive.toml").wrap_err("Could not load drive params")?;
    let traj_gen_params: traj_gen::Params =
        util::params::load("traj_gen.toml").wrap_err("Could not load trajectory params")?;
    let traj_follow_params: traj_follow::Params =
        util::params::load("traj_follow.toml").wrap_err("Could not load follower params")?;
    let sim_params: sim::Params =
        util::params::load("sim.toml").wrap_err("Could not load simulation params")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut kin =
        SwerveKinematics::new(&drive_params).wrap_err("Failed to initialise kinematics")?;
    info!("Kinematics init complete");

    let traj_config = TrajConfig::for_drivetrain(traj_gen_params, &kin)
        .wrap_err("Invalid trajectory configuration")?;

    let mut follower =
        TrajFollower::new(traj_follow_params).wrap_err("Failed to initialise TrajFollower")?;
    info!("TrajFollower init complete");

    let mut robot_sim = SwerveSim::new(&drive_params, &sim_params)
        .wrap_err("Failed to initialise the simulation")?;
    info!("Simulation init complete");

    let mut cycle_archive = match exec_params.archive {
        true => Some(CycleArchive::new(&session).wrap_err("Failed to create the cycle archive")?),
        false => None,
    };

    info!("Module initialisation complete\n");

    // ---- GENERATE TRAJECTORY ----

    let gen_start = Instant::now();
    let traj = Arc::new(
        generate(&exec_params.routine.waypoints(), &traj_config)
            .wrap_err("Failed to generate the trajectory")?,
    );
    info!(
        "Generated {:?} trajectory in {:.03} ms: {:.02} m over {:.02} s, {} samples, {} warnings",
        exec_params.routine,
        gen_start.elapsed().as_secs_f64() * 1e3,
        traj.path_length_m(),
        traj.total_time_s(),
        traj.states().len(),
        traj.warnings().len()
    );

    session.save("trajectory.json", (*traj).clone());

    // Start the robot where the trajectory starts
    let start_pose = traj.initial_pose();
    robot_sim.reset(start_pose);
    let mut odometry = Odometry::new(start_pose, robot_sim.pose().heading_rad);

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let ctrl_period_s = drive_params.ctrl_period_s;
    let mut num_cycles: u64 = 0;
    let mut num_cycle_overruns: u64 = 0;
    let mut num_brownout_cycles: u64 = 0;
    let mut settle_cycles_left = exec_params.settle_cycles;
    let mut traj_started = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let disabled = num_cycles < exec_params.disabled_cycles;
        let mut record = CycleRecord::new(num_cycles, disabled);

        // ---- TRAJECTORY FOLLOWING ----

        if !disabled && !traj_started {
            follower
                .begin(Arc::clone(&traj))
                .wrap_err("Failed to begin the trajectory")?;
            traj_started = true;
            info!("Trajectory started");
        }

        let odom_pose = odometry.pose();
        let cmd = match follower.proc(&traj_follow::InputData { pose: odom_pose }) {
            Ok((Some(cmd), rpt)) => {
                if let Some(sample) = traj.states().get(rpt.sample_index) {
                    record.set_traj(sample);
                }
                record.cross_track_error_m = rpt.cross_track_error_m;
                record.head_error_rad = rpt.head_error_rad;

                if rpt.finished {
                    info!("Trajectory finished, settling for {} cycles", settle_cycles_left);
                }

                cmd
            }
            Ok((None, _)) => ChassisVelocity::zero(),
            Err(e) => {
                warn!("Error during TrajFollower processing: {}", e);
                follower.abort();
                ChassisVelocity::zero()
            }
        };

        // ---- KINEMATICS ----

        let (cmd, clamped) = cmd.clamp_to_limits(&drive_params);
        record.set_cmd(&cmd, clamped);

        let states = match kin.proc(&kinematics::InputData {
            cmd,
            cor_m: Vector2::zeros(),
        }) {
            Ok((states, rpt)) => {
                record.desaturated = rpt.desaturated;
                states
            }
            Err(e) => {
                warn!("Error during kinematics processing: {}", e);
                kin
                    .to_module_states(&ChassisVelocity::zero(), &Vector2::zeros())
                    .map(|(s, _)| s)
                    .wrap_err("Could not compute stopped module states")?
            }
        };
        record.set_module_states(&states);

        // ---- SIMULATION ----

        let (sim_out, sim_rpt) = robot_sim
            .proc(&sim::InputData {
                cmd: SimCommand::States(states),
                is_disabled: disabled,
            })
            .wrap_err("Simulation step failed")?;

        if sim_rpt.brownout_entered || sim_rpt.brownout_cleared {
            debug!(
                "Brownout state changed on cycle {}, {} of {} sub-steps browned out",
                num_cycles,
                sim_out.power.brownout_substeps,
                sim_rpt.sub_steps.len()
            );
        }
        if sim_out.power.brownout_substeps > 0 {
            num_brownout_cycles += 1;
        }

        record.set_sim_pose(&sim_out.pose);
        record.battery_v = sim_out.power.terminal_voltage_v;
        record.total_current_a = sim_out.power.total_current_a;
        record.browned_out = sim_out.power.browned_out;
        record.brownout_substeps = sim_out.power.brownout_substeps;

        // ---- ODOMETRY ----

        let odom_pose = odometry.update(
            &kin,
            &sim_out.measured_states,
            sim_out.gyro_rad,
            ctrl_period_s,
        );
        record.set_odom_pose(&odom_pose);

        // ---- WRITE ARCHIVES ----

        if let Some(ref mut arch) = cycle_archive {
            arch.record = record;
            if let Err(e) = arch.write() {
                warn!("Could not write the cycle archive: {}", e);
            }
        }

        num_cycles += 1;

        // ---- END CONDITION ----

        if traj_started && follower.mode() == TrajFollowMode::Off {
            if settle_cycles_left == 0 {
                break;
            }
            settle_cycles_left -= 1;
        }

        // ---- CYCLE MANAGEMENT ----

        if exec_params.real_time {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match Duration::from_secs_f64(ctrl_period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - ctrl_period_s
                    );
                    num_cycle_overruns += 1;
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    let final_pose = robot_sim.pose();
    let target_pose = traj.final_pose();
    info!(
        "Ran {} cycles ({:.02} s simulated), {} overruns, {} cycles with brownout",
        num_cycles,
        num_cycles as f64 * ctrl_period_s,
        num_cycle_overruns,
        num_brownout_cycles
    );
    info!(
        "Final pose ({:.03} m, {:.03} m, {:.02} deg), {:.03} m and {:.02} deg from the target",
        final_pose.x_m(),
        final_pose.y_m(),
        final_pose.heading_rad.to_degrees(),
        final_pose.distance_to(&target_pose),
        util::maths::get_ang_dist(final_pose.heading_rad, target_pose.heading_rad).to_degrees()
    );
    info!(
        "Odometry drift {:.03} m",
        odometry.pose().distance_to(&final_pose)
    );

    info!("End of execution");

    session.exit();

    Ok(())
}
