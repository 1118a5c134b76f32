//! # Trajectory following module
//!
//! Follows a generated trajectory one sample per control cycle. The follower
//! is a cursor over a shared `Trajectory`: each call to `next_cmd` consumes
//! the next sample and returns a robot frame chassis velocity made of the
//! sample's feedforward velocity plus PID corrections of the position and
//! heading errors. Following is stopped by calling `abort`, or ends by itself
//! once every sample has been consumed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::*;
pub use state::*;
