//! Constraints on the trajectory speed profile

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::drive_params::{check_positive, ConfigError, ModuleArray};
use crate::kinematics::SwerveKinematics;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on the subdivided path, as seen by the constraints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PathPoint {
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Direction the robot centre moves in at this point, in the field frame.
    ///
    /// Units: radians
    pub travel_rad: f64,

    /// Robot heading at this point.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Curvature of the path in the direction of travel.
    ///
    /// Units: 1/meters
    pub curvature_radpm: f64,

    /// Rate of change of the robot heading with distance travelled.
    ///
    /// Units: radians/meter
    pub heading_rate_radpm: f64,

    /// Distance along the path from the first waypoint.
    ///
    /// Units: meters
    pub path_length_m: f64,
}

/// Acceleration limits at a point on the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelBounds {
    /// Units: meters/second^2
    pub min_mss: f64,

    /// Units: meters/second^2
    pub max_mss: f64,
}

/// Limits the path speed so that no module exceeds its maximum speed, taking
/// account of the robot turning as it moves.
#[derive(Debug, Clone, Copy)]
pub struct SwerveKinematicsConstraint {
    module_positions_m: ModuleArray<Vector2<f64>>,

    /// Units: meters/second
    max_module_speed_ms: f64,
}

/// Limits the acceleration towards the centre of curvature.
#[derive(Debug, Clone, Copy)]
pub struct CentripetalAccelConstraint {
    /// Units: meters/second^2
    max_centripetal_accel_mss: f64,
}

/// Limits the speed inside an axis aligned rectangle of the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxVelocityRegion {
    /// Units: meters
    pub min_corner_m: [f64; 2],

    /// Units: meters
    pub max_corner_m: [f64; 2],

    /// Units: meters/second
    pub max_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A limit on the speed and acceleration of the robot along a path.
pub trait TrajConstraint {
    /// Highest speed allowed at the given point.
    ///
    /// Units: meters/second
    fn max_velocity_ms(&self, point: &PathPoint) -> f64;

    /// Acceleration limits at the given point when moving at `speed_ms`.
    fn accel_bounds(&self, _point: &PathPoint, _speed_ms: f64) -> AccelBounds {
        AccelBounds::unlimited()
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AccelBounds {
    pub fn unlimited() -> Self {
        Self {
            min_mss: f64::NEG_INFINITY,
            max_mss: f64::INFINITY,
        }
    }
}

impl SwerveKinematicsConstraint {
    pub fn new(kinematics: &SwerveKinematics) -> Self {
        Self {
            module_positions_m: kinematics.geometry().positions_m(),
            max_module_speed_ms: kinematics.max_module_speed_ms(),
        }
    }
}

impl TrajConstraint for SwerveKinematicsConstraint {
    fn max_velocity_ms(&self, point: &PathPoint) -> f64 {
        // Module velocity per unit path speed: the travel direction in the
        // robot frame plus the tangential velocity from turning.
        let (s, c) = (point.travel_rad - point.heading_rad).sin_cos();
        let k = point.heading_rate_radpm;

        let max_gain = self
            .module_positions_m
            .iter()
            .map(|r| Vector2::new(c - k * r.y, s + k * r.x).norm())
            .fold(0f64, f64::max);

        if max_gain > 0.0 {
            self.max_module_speed_ms / max_gain
        }
        else {
            f64::INFINITY
        }
    }
}

impl CentripetalAccelConstraint {
    pub fn new(max_centripetal_accel_mss: f64) -> Self {
        Self { max_centripetal_accel_mss }
    }
}

impl TrajConstraint for CentripetalAccelConstraint {
    fn max_velocity_ms(&self, point: &PathPoint) -> f64 {
        // a = v^2 * k
        if point.curvature_radpm.abs() > 0.0 {
            (self.max_centripetal_accel_mss / point.curvature_radpm.abs()).sqrt()
        }
        else {
            f64::INFINITY
        }
    }
}

impl MaxVelocityRegion {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("velocity_regions.max_speed_ms", self.max_speed_ms)?;

        if self.min_corner_m[0] > self.max_corner_m[0] || self.min_corner_m[1] > self.max_corner_m[1] {
            return Err(ConfigError::Invalid {
                name: "velocity_regions",
                reason: format!(
                    "min corner {:?} is not below max corner {:?}",
                    self.min_corner_m, self.max_corner_m
                ),
            });
        }

        Ok(())
    }

    pub fn contains(&self, point_m: &Vector2<f64>) -> bool {
        point_m.x >= self.min_corner_m[0]
            && point_m.x <= self.max_corner_m[0]
            && point_m.y >= self.min_corner_m[1]
            && point_m.y <= self.max_corner_m[1]
    }
}

impl TrajConstraint for MaxVelocityRegion {
    fn max_velocity_ms(&self, point: &PathPoint) -> f64 {
        if self.contains(&point.position_m) {
            self.max_speed_ms
        }
        else {
            f64::INFINITY
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_params::Params;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_4;

    fn test_constraint() -> SwerveKinematicsConstraint {
        let mut params = Params::default();
        params.wheelbase_width_m = 0.61;
        params.wheelbase_length_m = 0.61;
        params.max_module_speed_ms = 4.0;
        SwerveKinematicsConstraint::new(&SwerveKinematics::new(&params).unwrap())
    }

    #[test]
    fn test_swerve_constraint_no_rotation() {
        let c = test_constraint();

        // Without turning every module moves at the path speed
        let point = PathPoint {
            travel_rad: 0.3,
            heading_rad: -1.2,
            ..Default::default()
        };
        assert_abs_diff_eq!(c.max_velocity_ms(&point), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_swerve_constraint_with_rotation() {
        let c = test_constraint();

        // Travelling diagonally forward-left while turning at 1 rad/m. The
        // front right module sees the largest speed, with both components
        // increased by the turn.
        let point = PathPoint {
            travel_rad: FRAC_PI_4,
            heading_rad: 0.0,
            heading_rate_radpm: 1.0,
            ..Default::default()
        };
        let gain = FRAC_PI_4.cos() + 0.305;
        let expected = 4.0 / (2.0 * gain.powi(2)).sqrt();
        assert_abs_diff_eq!(c.max_velocity_ms(&point), expected, epsilon = 1e-12);

        // Turning can never make the module allowance larger
        assert!(c.max_velocity_ms(&point) < 4.0);
    }

    #[test]
    fn test_centripetal() {
        let c = CentripetalAccelConstraint::new(2.0);
        let mut point = PathPoint::default();
        assert!(c.max_velocity_ms(&point).is_infinite());

        point.curvature_radpm = -0.5;
        assert_abs_diff_eq!(c.max_velocity_ms(&point), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_region() {
        let r = MaxVelocityRegion {
            min_corner_m: [1.0, 1.0],
            max_corner_m: [2.0, 3.0],
            max_speed_ms: 0.5,
        };
        assert!(r.validate().is_ok());

        let mut point = PathPoint::default();
        assert!(r.max_velocity_ms(&point).is_infinite());
        point.position_m = Vector2::new(1.5, 2.0);
        assert_abs_diff_eq!(r.max_velocity_ms(&point), 0.5);

        let bad = MaxVelocityRegion {
            min_corner_m: [2.0, 1.0],
            max_corner_m: [1.0, 3.0],
            max_speed_ms: 0.5,
        };
        assert!(bad.validate().is_err());
    }
}
