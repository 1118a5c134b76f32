//! # Trajectory generation module
//!
//! Generates time parameterised trajectories through a list of waypoints.
//!
//! Generation happens in three stages:
//!
//! 1. A quintic Hermite spline is fitted between each pair of waypoints and
//!    subdivided until the path between neighbouring points is close to a
//!    straight line. The robot heading is interpolated along each spline
//!    independently of the direction of travel.
//! 2. The subdivided path is given a speed profile: a forward pass limited by
//!    the maximum acceleration from the start speed, a backward pass limited
//!    by the maximum acceleration into the end speed, and at every point the
//!    caps from each `TrajConstraint`.
//! 3. The profile is integrated into time and resampled at a fixed period.
//!
//! The resulting `Trajectory` is immutable and is normally shared between
//! consumers in an `Arc`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod constraint;
mod generate;
mod params;
mod profile;
mod spline;
mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use constraint::*;
pub use generate::*;
pub use params::*;
pub use spline::*;
pub use trajectory::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point at which the constraints could not be met and the profile was
/// clamped instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintWarning {
    /// Distance along the path of the offending point.
    ///
    /// Units: meters
    pub path_length_m: f64,

    pub kind: ConstraintWarningKind,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The ways a constraint can be unachievable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ConstraintWarningKind {
    /// The constraints would hold the speed at this point below the minimum
    /// speed the profile can move at, so it was raised to the minimum.
    SpeedBelowMinimum { speed_ms: f64, min_speed_ms: f64 },

    /// The constraints require a minimum acceleration above the maximum
    /// acceleration at this point, so the minimum was lowered to the maximum.
    InfeasibleAccel { min_accel_mss: f64, max_accel_mss: f64 },

    /// The start speed is above what the constraints allow at the start, or
    /// too fast to slow down within the path.
    StartSpeedUnreachable { reached_ms: f64, requested_ms: f64 },

    /// The end speed can't be reached within the path length or is above
    /// what the constraints allow at the end.
    EndSpeedUnreachable { reached_ms: f64, requested_ms: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl std::fmt::Display for ConstraintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ConstraintWarningKind::SpeedBelowMinimum { speed_ms, min_speed_ms } => write!(
                f,
                "at {:.3} m the allowed speed ({:.4} m/s) is below the minimum speed ({:.4} m/s)",
                self.path_length_m, speed_ms, min_speed_ms
            ),
            ConstraintWarningKind::InfeasibleAccel { min_accel_mss, max_accel_mss } => write!(
                f,
                "at {:.3} m the minimum acceleration ({:.3} m/s^2) exceeds the maximum \
                 ({:.3} m/s^2)",
                self.path_length_m, min_accel_mss, max_accel_mss
            ),
            ConstraintWarningKind::StartSpeedUnreachable { reached_ms, requested_ms } => write!(
                f,
                "the trajectory starts at {:.4} m/s instead of the requested {:.4} m/s",
                reached_ms, requested_ms
            ),
            ConstraintWarningKind::EndSpeedUnreachable { reached_ms, requested_ms } => write!(
                f,
                "at {:.3} m the trajectory ends at {:.4} m/s instead of the requested \
                 {:.4} m/s",
                self.path_length_m, reached_ms, requested_ms
            ),
        }
    }
}
