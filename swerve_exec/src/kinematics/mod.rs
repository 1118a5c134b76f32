//! # Kinematics module
//!
//! Stateless-in-spirit transform between the chassis velocity of the robot
//! (forward, strafe, rotate in the robot frame) and the speed and angle of
//! each of the four swerve modules.
//!
//! The inverse direction (chassis to modules) computes each module's velocity
//! vector as the chassis translation plus the tangential velocity due to
//! rotation about the centre of rotation. If any module would exceed the
//! maximum module speed all modules are scaled down by the same factor, which
//! keeps the path curvature of the robot unchanged.
//!
//! The only state kept is the last commanded module angle, which is held when
//! a module is commanded to (near) zero speed so that the steer axes do not
//! chatter.
//!
//! The forward direction (modules to chassis, used for odometry) solves the
//! over-determined system of 8 velocity components for the 3 chassis
//! velocities in the least squares sense.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chassis;
mod module_state;
mod odometry;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use chassis::*;
pub use module_state::*;
pub use odometry::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Module speed below which the previous module angle is held.
///
/// Units: meters/second
pub const ANGLE_HOLD_SPEED_MS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during kinematics processing.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("The chassis velocity command is not finite: {0:?}")]
    NonFiniteCommand(ChassisVelocity),

    #[error("The centre of rotation is not finite: ({0}, {1})")]
    NonFiniteCentreOfRotation(f64, f64),
}
