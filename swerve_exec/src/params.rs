//! # Swerve Executable Parameters
//!
//! This module provides the parameters for the swerve executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::Pose2;
use crate::traj_gen::Waypoint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwerveExecParams {
    /// The manoeuvre to drive.
    pub routine: Routine,

    /// If true each control cycle waits for the rest of its period, so the
    /// simulation runs in real time.
    pub real_time: bool,

    /// If true each cycle is written to the session archive.
    pub archive: bool,

    /// Number of cycles to keep running once the trajectory is finished, so
    /// the robot comes to rest.
    pub settle_cycles: u64,

    /// Hold the robot disabled for this many cycles before the trajectory
    /// begins.
    pub disabled_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Manoeuvres the executable can drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Routine {
    /// An arc over the top of a semicircle, turning the robot from facing
    /// backwards to facing forwards on the way.
    SemiCircle,

    /// Two meters straight ahead, facing forwards.
    Straight,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for SwerveExecParams {
    fn default() -> Self {
        Self {
            routine: Routine::SemiCircle,
            real_time: false,
            archive: true,
            settle_cycles: 50,
            disabled_cycles: 0,
        }
    }
}

impl Routine {
    /// The waypoints of this routine.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        match self {
            Routine::SemiCircle => vec![
                Waypoint::new(Pose2::from_degrees(1.0, 1.0, 45.0), Some(180f64.to_radians())),
                Waypoint::new(Pose2::from_degrees(4.0, 4.0, 0.0), Some(90f64.to_radians())),
                Waypoint::new(Pose2::from_degrees(7.0, 1.0, -45.0), Some(0.0)),
            ],
            Routine::Straight => vec![
                Waypoint::from(Pose2::new(1.0, 1.0, 0.0)),
                Waypoint::from(Pose2::new(3.0, 1.0, 0.0)),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let p: SwerveExecParams = util::params::from_str(
            r#"
            routine = "Straight"
            real_time = true
            archive = false
            settle_cycles = 10
            disabled_cycles = 5
            "#,
        )
        .unwrap();

        assert_eq!(p.routine, Routine::Straight);
        assert!(p.real_time);
        assert_eq!(p.routine.waypoints().len(), 2);
        assert_eq!(Routine::SemiCircle.waypoints().len(), 3);
    }
}
