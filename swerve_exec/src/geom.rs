//! # Geometry module
//!
//! Rigid body poses and transforms in the plane. All frames are right handed
//! with X forward and Y to the left, angles are anticlockwise positive and
//! kept in the range (-pi, pi].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use util::maths::{lerp_angle, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The position and heading of a rigid body in some parent frame (usually
/// the field frame).
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position of the body's origin in the parent frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Angle between the parent's X axis and the body's X axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A relative pose between two frames, e.g. robot centre to a module.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform2 {
    /// Translation of the child frame's origin, expressed in the parent frame.
    ///
    /// Units: meters
    pub translation_m: Vector2<f64>,

    /// Rotation of the child frame relative to the parent frame.
    ///
    /// Units: radians
    pub rotation_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    /// Create a new pose, wrapping the heading into (-pi, pi].
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// Create a new pose with the heading given in degrees.
    pub fn from_degrees(x_m: f64, y_m: f64, heading_deg: f64) -> Self {
        Self::new(x_m, y_m, heading_deg.to_radians())
    }

    pub fn x_m(&self) -> f64 {
        self.position_m.x
    }

    pub fn y_m(&self) -> f64 {
        self.position_m.y
    }

    /// Apply a body-relative transform to this pose.
    pub fn transform_by(&self, transform: &Transform2) -> Self {
        Self {
            position_m: self.position_m
                + Rotation2::new(self.heading_rad) * transform.translation_m,
            heading_rad: wrap_pi(self.heading_rad + transform.rotation_rad),
        }
    }

    /// Express this pose relative to `origin`.
    pub fn relative_to(&self, origin: &Pose2) -> Self {
        let t = Transform2::between(origin, self);
        Self {
            position_m: t.translation_m,
            heading_rad: t.rotation_rad,
        }
    }

    /// Euclidian distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose2) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Linearly interpolate the position and interpolate the heading along
    /// the shortest arc.
    pub fn interpolate(&self, other: &Pose2, frac: f64) -> Self {
        Self {
            position_m: self.position_m.lerp(&other.position_m, frac),
            heading_rad: lerp_angle(self.heading_rad, other.heading_rad, frac),
        }
    }
}

impl Transform2 {
    pub fn new(translation_m: Vector2<f64>, rotation_rad: f64) -> Self {
        Self {
            translation_m,
            rotation_rad: wrap_pi(rotation_rad),
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// The transform which takes `from` onto `to`, expressed in `from`'s frame.
    pub fn between(from: &Pose2, to: &Pose2) -> Self {
        Self {
            translation_m: Rotation2::new(-from.heading_rad) * (to.position_m - from.position_m),
            rotation_rad: wrap_pi(to.heading_rad - from.heading_rad),
        }
    }

    /// Chain `other` after `self`, where `other` is expressed in the child
    /// frame of `self`.
    pub fn compose(&self, other: &Transform2) -> Self {
        Self {
            translation_m: self.translation_m
                + Rotation2::new(self.rotation_rad) * other.translation_m,
            rotation_rad: wrap_pi(self.rotation_rad + other.rotation_rad),
        }
    }

    /// The transform which undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            translation_m: -(Rotation2::new(-self.rotation_rad) * self.translation_m),
            rotation_rad: wrap_pi(-self.rotation_rad),
        }
    }

    /// The transform reached by moving along a constant-curvature arc with the
    /// given body-frame displacement and rotation.
    pub fn exp(dx_m: f64, dy_m: f64, dtheta_rad: f64) -> Self {
        let (sin_t, cos_t) = dtheta_rad.sin_cos();

        let (s, c) = if dtheta_rad.abs() < 1e-9 {
            (1.0 - dtheta_rad.powi(2) / 6.0, 0.5 * dtheta_rad)
        }
        else {
            (sin_t / dtheta_rad, (1.0 - cos_t) / dtheta_rad)
        };

        Self::new(
            Vector2::new(dx_m * s - dy_m * c, dx_m * c + dy_m * s),
            dtheta_rad,
        )
    }

    /// Inverse of `exp`: the arc displacement `(dx, dy, dtheta)` which
    /// produces this transform.
    pub fn log(&self) -> (f64, f64, f64) {
        let dtheta = self.rotation_rad;
        let half_dtheta = dtheta / 2.0;
        let cos_minus_one = dtheta.cos() - 1.0;

        let half_theta_by_tan = if cos_minus_one.abs() < 1e-9 {
            1.0 - dtheta.powi(2) / 12.0
        }
        else {
            -(half_dtheta * dtheta.sin()) / cos_minus_one
        };

        let scale = half_theta_by_tan.hypot(half_dtheta);
        let t = Rotation2::new((-half_dtheta).atan2(half_theta_by_tan))
            * self.translation_m
            * scale;

        (t.x, t.y, dtheta)
    }

    /// Map a point from the child frame into the parent frame.
    pub fn apply_to_point(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.rotation_rad) * point_m + self.translation_m
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let t = Transform2::new(Vector2::new(1.2, -0.4), 2.1);
        let ident = t.compose(&t.inverse());

        assert_abs_diff_eq!(ident.translation_m.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ident.translation_m.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ident.rotation_rad, 0.0, epsilon = 1e-12);

        let ident = t.inverse().compose(&t);
        assert_abs_diff_eq!(ident.translation_m.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_by() {
        // Robot facing +Y, camera mounted 0.3 m ahead of centre
        let pose = Pose2::new(2.0, 1.0, FRAC_PI_2);
        let cam = pose.transform_by(&Transform2::new(Vector2::new(0.3, 0.0), 0.0));

        assert_abs_diff_eq!(cam.x_m(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cam.y_m(), 1.3, epsilon = 1e-12);
        assert_abs_diff_eq!(cam.heading_rad, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_between_and_relative_to() {
        let a = Pose2::new(1.0, 1.0, PI);
        let b = Pose2::new(0.0, 1.0, -FRAC_PI_2);

        // b is 1 m ahead of a, turned 90 deg further anticlockwise
        let rel = b.relative_to(&a);
        assert_abs_diff_eq!(rel.x_m(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rel.y_m(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rel.heading_rad, FRAC_PI_2, epsilon = 1e-12);

        // Going back through the transform gets us to b
        let b2 = a.transform_by(&Transform2::between(&a, &b));
        assert_abs_diff_eq!(b2.distance_to(&b), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exp_log() {
        // Quarter circle of radius 1 m
        let t = Transform2::exp(FRAC_PI_2, 0.0, FRAC_PI_2);
        assert_abs_diff_eq!(t.translation_m.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.translation_m.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.rotation_rad, FRAC_PI_2, epsilon = 1e-12);

        let (dx, dy, dtheta) = Transform2::new(Vector2::new(0.4, -0.2), 0.7).log();
        let t = Transform2::exp(dx, dy, dtheta);
        assert_abs_diff_eq!(t.translation_m.x, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(t.translation_m.y, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(t.rotation_rad, 0.7, epsilon = 1e-12);

        // Straight line
        let t = Transform2::exp(1.5, 0.5, 0.0);
        assert_abs_diff_eq!(t.translation_m.x, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.translation_m.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_shortest_arc() {
        let a = Pose2::new(0.0, 0.0, PI - 0.1);
        let b = Pose2::new(2.0, 0.0, -PI + 0.1);
        let mid = a.interpolate(&b, 0.5);

        assert_abs_diff_eq!(mid.x_m(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mid.heading_rad.abs(), PI, epsilon = 1e-12);
    }
}
