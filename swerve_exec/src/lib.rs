//! # Swerve library.
//!
//! This library holds the core of the swerve drive software: the geometry of
//! the drivetrain, the kinematics between chassis and module motion,
//! trajectory generation and following, and the physical simulation used in
//! place of the hardware.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Rigid body geometry - poses and transforms in the plane
pub mod geom;

/// Drivetrain constants - the fixed physical parameters of the robot and its module geometry
pub mod drive_params;

/// Kinematics - converts chassis velocities into module states and back
pub mod kinematics;

/// Trajectory generation - produces time parameterised trajectories through waypoints
pub mod traj_gen;

/// Trajectory following - steps through a trajectory once per control cycle
pub mod traj_follow;

/// Simulation - the physical and electrical model of the robot
pub mod sim;

/// Executable parameters - options for the simulated control loop
pub mod params;
