//! # Drivetrain parameters module
//!
//! This module provides the fixed physical constants of the robot. They are
//! loaded once at start-up, validated, and then passed by reference into the
//! constructor of every other module. Nothing here is mutated after loading.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod module_geom;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use module_geom::*;
pub use params::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the robot.
pub const NUM_MODULES: usize = 4;

/// An array holding one item per module, indexed by `ModuleId`.
pub type ModuleArray<T> = [T; NUM_MODULES];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An invalid constant or configuration value.
///
/// These are fatal at setup and are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, found {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, found {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} must be finite, found {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Module geometry is degenerate: {0}")]
    DegenerateGeometry(String),

    #[error("A trajectory needs at least 2 waypoints, found {0}")]
    TooFewWaypoints(usize),

    #[error("Expected one heading per waypoint ({expected}), found {found}")]
    HeadingCountMismatch { expected: usize, found: usize },

    #[error(
        "The simulation period ({sim_period_s} s) must evenly divide the control period \
         ({ctrl_period_s} s)"
    )]
    PeriodMismatch { ctrl_period_s: f64, sim_period_s: f64 },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that the named value is finite and strictly positive.
pub fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    }
    else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Check that the named value is finite and not negative.
pub fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        Err(ConfigError::NonFinite { name, value })
    }
    else if value < 0.0 {
        Err(ConfigError::Negative { name, value })
    }
    else {
        Ok(())
    }
}

/// Check that the named value is finite.
pub fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    }
    else {
        Err(ConfigError::NonFinite { name, value })
    }
}
