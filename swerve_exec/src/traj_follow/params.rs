//! Trajectory following parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::drive_params::{check_non_negative, check_positive, ConfigError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory following
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Params {

    /// Position controller proportional gain, applied to the field X and Y
    /// errors.
    ///
    /// Units: 1/seconds
    pub pos_k_p: f64,

    /// Position controller integral gain
    pub pos_k_i: f64,

    /// Position controller derivative gain
    pub pos_k_d: f64,

    /// Heading controller proportional gain
    ///
    /// Units: 1/seconds
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Limit on the magnitude of the position correction velocity.
    ///
    /// Units: meters/second
    pub max_pos_correction_ms: f64,

    /// Limit on the magnitude of the heading correction rate.
    ///
    /// Units: radians/second
    pub max_head_correction_rads: f64,

    /// Cross track error above which the report flags the limit as exceeded.
    ///
    /// Units: meters
    pub cross_track_error_limit_m: f64,

    /// Heading error above which the report flags the limit as exceeded.
    ///
    /// Units: radians
    pub head_error_limit_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            pos_k_p: 1.0,
            pos_k_i: 0.0,
            pos_k_d: 0.0,
            head_k_p: 2.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            max_pos_correction_ms: 1.0,
            max_head_correction_rads: 2.0,
            cross_track_error_limit_m: 0.5,
            head_error_limit_rad: 0.5,
        }
    }
}

impl Params {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("pos_k_p", self.pos_k_p)?;
        check_non_negative("pos_k_i", self.pos_k_i)?;
        check_non_negative("pos_k_d", self.pos_k_d)?;
        check_non_negative("head_k_p", self.head_k_p)?;
        check_non_negative("head_k_i", self.head_k_i)?;
        check_non_negative("head_k_d", self.head_k_d)?;
        check_non_negative("max_pos_correction_ms", self.max_pos_correction_ms)?;
        check_non_negative("max_head_correction_rads", self.max_head_correction_rads)?;
        check_positive("cross_track_error_limit_m", self.cross_track_error_limit_m)?;
        check_positive("head_error_limit_rad", self.head_error_limit_rad)?;

        Ok(())
    }
}
