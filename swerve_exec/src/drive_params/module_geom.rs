//! Module identities and their positions on the robot

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::{ConfigError, ModuleArray, Params, NUM_MODULES};
use crate::geom::Transform2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The fixed placement of every module relative to the robot centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModuleGeometry {
    /// Transform from the robot centre to each module's steer axis, indexed
    /// by `ModuleId`.
    robot_to_module: ModuleArray<Transform2>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identity of a module. The discriminant is the module's index in every
/// `ModuleArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleId {
    FrontLeft = 0,
    FrontRight = 1,
    BackLeft = 2,
    BackRight = 3,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleId {
    /// All modules in index order.
    pub const ALL: ModuleArray<ModuleId> = [
        ModuleId::FrontLeft,
        ModuleId::FrontRight,
        ModuleId::BackLeft,
        ModuleId::BackRight,
    ];

    /// Index of this module in a `ModuleArray`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in logs and archive column names.
    pub fn short_name(self) -> &'static str {
        match self {
            ModuleId::FrontLeft => "fl",
            ModuleId::FrontRight => "fr",
            ModuleId::BackLeft => "bl",
            ModuleId::BackRight => "br",
        }
    }
}

impl ModuleGeometry {
    /// Compute the module placement for a rectangular wheelbase.
    ///
    /// Modules sit at (+-L/2, +-W/2) from the robot centre, X forward and Y
    /// left.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let half_l = params.wheelbase_length_m / 2.0;
        let half_w = params.wheelbase_width_m / 2.0;

        Self::from_positions([
            Vector2::new(half_l, half_w),
            Vector2::new(half_l, -half_w),
            Vector2::new(-half_l, half_w),
            Vector2::new(-half_l, -half_w),
        ])
    }

    /// Build a geometry from arbitrary module positions, in `ModuleId` order.
    ///
    /// The geometry is rejected if any position is not finite, or if the
    /// modules cannot resolve a rotation (all modules coincident).
    pub fn from_positions(positions_m: ModuleArray<Vector2<f64>>) -> Result<Self, ConfigError> {
        if positions_m.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(ConfigError::DegenerateGeometry(String::from(
                "module position is not finite",
            )));
        }

        let centroid_m = positions_m.iter().sum::<Vector2<f64>>() / NUM_MODULES as f64;
        let spread_m = positions_m
            .iter()
            .map(|p| (p - centroid_m).norm())
            .fold(0f64, f64::max);
        if spread_m < 1e-6 {
            return Err(ConfigError::DegenerateGeometry(String::from(
                "all modules are at the same position",
            )));
        }

        let mut robot_to_module = [Transform2::identity(); NUM_MODULES];
        for (t, p) in robot_to_module.iter_mut().zip(positions_m.iter()) {
            *t = Transform2::new(*p, 0.0);
        }

        Ok(Self { robot_to_module })
    }

    /// Transform from the robot centre to the given module.
    pub fn robot_to_module(&self, id: ModuleId) -> &Transform2 {
        &self.robot_to_module[id.index()]
    }

    /// Position of the given module in the robot frame.
    ///
    /// Units: meters
    pub fn position_m(&self, id: ModuleId) -> Vector2<f64> {
        self.robot_to_module[id.index()].translation_m
    }

    /// Positions of all modules in the robot frame.
    ///
    /// Units: meters
    pub fn positions_m(&self) -> ModuleArray<Vector2<f64>> {
        let mut p = [Vector2::zeros(); NUM_MODULES];
        for id in ModuleId::ALL.iter() {
            p[id.index()] = self.position_m(*id);
        }
        p
    }

    /// Largest distance from the robot centre to any module.
    ///
    /// Units: meters
    pub fn max_radius_m(&self) -> f64 {
        self.robot_to_module
            .iter()
            .map(|t| t.translation_m.norm())
            .fold(0f64, f64::max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangular_geometry_is_symmetric() {
        let mut params = Params::default();
        params.wheelbase_width_m = 0.61;
        params.wheelbase_length_m = 0.61;
        let geom = ModuleGeometry::from_params(&params).unwrap();

        let fl = geom.position_m(ModuleId::FrontLeft);
        let br = geom.position_m(ModuleId::BackRight);
        assert_relative_eq!(fl.x, 0.305);
        assert_relative_eq!(fl.y, 0.305);
        assert_relative_eq!(fl, -br);

        let fr = geom.position_m(ModuleId::FrontRight);
        let bl = geom.position_m(ModuleId::BackLeft);
        assert_relative_eq!(fr, -bl);
        assert_relative_eq!(fr.y, -0.305);

        assert_relative_eq!(geom.max_radius_m(), 0.305 * 2f64.sqrt());
    }

    #[test]
    fn test_module_indices_fixed() {
        for (i, id) in ModuleId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        let r = ModuleGeometry::from_positions([Vector2::new(0.1, 0.1); NUM_MODULES]);
        assert!(matches!(r, Err(ConfigError::DegenerateGeometry(_))));
    }
}
