//! Parameters and configuration for trajectory generation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Internal
use super::{CentripetalAccelConstraint, MaxVelocityRegion, SwerveKinematicsConstraint, TrajConstraint};
use crate::drive_params::{check_non_negative, check_positive, ConfigError};
use crate::kinematics::SwerveKinematics;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {

    // ---- SPEED PROFILE ----

    /// Maximum chassis speed along the path.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum chassis acceleration along the path.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Speed at the first waypoint.
    ///
    /// Units: meters/second
    pub start_speed_ms: f64,

    /// Speed at the last waypoint.
    ///
    /// Units: meters/second
    pub end_speed_ms: f64,

    /// If true the robot drives the path backwards, i.e. the waypoint
    /// rotations point opposite to the direction of travel.
    pub reversed: bool,

    /// Lowest speed cap allowed at an interior point. Caps below this are
    /// raised to it and reported, as a zero speed cap would stall the profile.
    ///
    /// Units: meters/second
    pub min_speed_ms: f64,

    /// Optional limit on centripetal acceleration.
    ///
    /// Units: meters/second^2
    pub max_centripetal_accel_mss: Option<f64>,

    /// Regions of the field with a lower speed limit.
    #[serde(default)]
    pub velocity_regions: Vec<MaxVelocityRegion>,

    // ---- SUBDIVISION ----

    /// Maximum step along the path direction between path points.
    ///
    /// Units: meters
    pub max_dx_m: f64,

    /// Maximum step across the path direction between path points.
    ///
    /// Units: meters
    pub max_dy_m: f64,

    /// Maximum change in the direction of travel between path points.
    ///
    /// Units: radians
    pub max_dtheta_rad: f64,

    // ---- SAMPLING ----

    /// Period at which the finished trajectory is sampled, normally the
    /// control period.
    ///
    /// Units: seconds
    pub sample_period_s: f64,
}

/// Full configuration for trajectory generation, the parameters plus any
/// constraints supplied in code.
#[derive(Clone)]
pub struct TrajConfig {
    pub params: Params,

    constraints: Vec<Arc<dyn TrajConstraint + Send + Sync>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        let drive = crate::drive_params::Params::default();

        Self {
            max_speed_ms: drive.max_fwd_rev_speed_ms,
            max_accel_mss: drive.max_translate_accel_mss,
            start_speed_ms: 0.0,
            end_speed_ms: 0.0,
            reversed: false,
            min_speed_ms: 1e-3,
            max_centripetal_accel_mss: None,
            velocity_regions: Vec::new(),
            max_dx_m: 0.127,
            max_dy_m: 0.00127,
            max_dtheta_rad: 0.0872,
            sample_period_s: drive.ctrl_period_s,
        }
    }
}

impl Params {
    /// Determines if the parameters are valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("max_speed_ms", self.max_speed_ms)?;
        check_positive("max_accel_mss", self.max_accel_mss)?;
        check_non_negative("start_speed_ms", self.start_speed_ms)?;
        check_non_negative("end_speed_ms", self.end_speed_ms)?;
        check_positive("min_speed_ms", self.min_speed_ms)?;
        check_positive("max_dx_m", self.max_dx_m)?;
        check_positive("max_dy_m", self.max_dy_m)?;
        check_positive("max_dtheta_rad", self.max_dtheta_rad)?;
        check_positive("sample_period_s", self.sample_period_s)?;

        if let Some(a) = self.max_centripetal_accel_mss {
            check_positive("max_centripetal_accel_mss", a)?;
        }

        for region in self.velocity_regions.iter() {
            region.validate()?;
        }

        if self.min_speed_ms >= self.max_speed_ms {
            return Err(ConfigError::Invalid {
                name: "min_speed_ms",
                reason: format!(
                    "must be below max_speed_ms ({} m/s), found {} m/s",
                    self.max_speed_ms, self.min_speed_ms
                ),
            });
        }

        Ok(())
    }
}

impl TrajConfig {
    /// Create a new configuration with no extra constraints.
    pub fn new(params: Params) -> Result<Self, ConfigError> {
        params.validate()?;

        Ok(Self {
            params,
            constraints: Vec::new(),
        })
    }

    /// Create a new configuration limited by the module speed of the given
    /// drivetrain.
    pub fn for_drivetrain(params: Params, kinematics: &SwerveKinematics) -> Result<Self, ConfigError> {
        let mut config = Self::new(params)?;
        config.add_constraint(SwerveKinematicsConstraint::new(kinematics));
        Ok(config)
    }

    /// Add a constraint applied on top of the maximum speed and acceleration.
    pub fn add_constraint<C>(&mut self, constraint: C)
    where
        C: TrajConstraint + Send + Sync + 'static,
    {
        self.constraints.push(Arc::new(constraint));
    }

    /// All constraints to apply, including those built from the parameters.
    pub(crate) fn all_constraints(&self) -> Vec<Arc<dyn TrajConstraint + Send + Sync>> {
        let mut all = self.constraints.clone();

        if let Some(a) = self.params.max_centripetal_accel_mss {
            all.push(Arc::new(CentripetalAccelConstraint::new(a)));
        }

        for region in self.params.velocity_regions.iter() {
            all.push(Arc::new(*region));
        }

        all
    }
}

impl std::fmt::Debug for TrajConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajConfig")
            .field("params", &self.params)
            .field("num_constraints", &self.constraints.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_non_positive_limits_fail() {
        let mut p = Params::default();
        p.max_speed_ms = 0.0;
        assert_eq!(
            TrajConfig::new(p).unwrap_err(),
            ConfigError::NonPositive { name: "max_speed_ms", value: 0.0 }
        );

        let mut p = Params::default();
        p.max_accel_mss = -2.0;
        assert!(matches!(
            TrajConfig::new(p),
            Err(ConfigError::NonPositive { name: "max_accel_mss", .. })
        ));
    }

    #[test]
    fn test_params_constraints_included() {
        let mut p = Params::default();
        p.max_centripetal_accel_mss = Some(2.0);
        p.velocity_regions.push(MaxVelocityRegion {
            min_corner_m: [0.0, 0.0],
            max_corner_m: [1.0, 1.0],
            max_speed_ms: 0.5,
        });

        let mut config = TrajConfig::new(p).unwrap();
        config.add_constraint(CentripetalAccelConstraint::new(3.0));
        assert_eq!(config.all_constraints().len(), 3);
    }
}
