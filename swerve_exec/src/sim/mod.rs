//! # Simulation module
//!
//! Stands in for the robot hardware. Each control cycle the simulation takes
//! the module commands and advances a model of the robot through a fixed
//! number of short sub-steps:
//!
//! 1. The battery terminal voltage from the last sub-step is compared against
//!    the brownout threshold.
//! 2. If the robot is disabled or browned out no voltage reaches the motors
//!    for this sub-step.
//! 3. The steer and drive motors, and the robot body they push on, are
//!    advanced by one sub-step.
//! 4. The battery voltage is recomputed from the current drawn by the motors
//!    plus a fixed quiescent draw.
//!
//! Brownout has no hysteresis, so a heavily loaded robot may alternate
//! between browned out and recovered sub-steps. That is deterministic and is
//! how the real voltage protection behaves.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod actuator;
mod battery;
mod drivetrain;
mod module;
mod motor;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use actuator::*;
pub use battery::*;
pub use drivetrain::*;
pub use module::*;
pub use motor::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Units: meters/second/second
pub const GRAVITY_MSS: f64 = 9.80665;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while stepping the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Module {0} has a non-finite command")]
    NonFiniteCommand(&'static str),
}
