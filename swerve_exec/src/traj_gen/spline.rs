//! Quintic Hermite splines and their subdivision into path points

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use crate::drive_params::ConfigError;
use crate::geom::{Pose2, Transform2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Ratio of the knot tangent magnitude to the straight line distance between
/// the knots.
const TANGENT_SCALE: f64 = 1.2;

/// Limit on the number of subdivisions of a single spline.
const MAX_SUBDIVISIONS: usize = 5000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A quintic polynomial in each of x and y over the parameter `t` in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuinticSpline {
    /// Coefficients of `t^0` to `t^5` for x.
    x_coeffs: [f64; 6],

    /// Coefficients of `t^0` to `t^5` for y.
    y_coeffs: [f64; 6],
}

/// A point on a spline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplinePoint {
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Direction of the spline tangent.
    ///
    /// Units: radians
    pub course_rad: f64,

    /// Signed curvature, positive turning anticlockwise.
    ///
    /// Units: 1/meters
    pub curvature_radpm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl QuinticSpline {
    /// Fit a spline from `start` to `end`, leaving each knot in the direction
    /// of the pose heading with zero second derivative.
    pub fn from_poses(start: &Pose2, end: &Pose2) -> Self {
        let scale = TANGENT_SCALE * start.distance_to(end);

        let (s0, c0) = start.heading_rad.sin_cos();
        let (s1, c1) = end.heading_rad.sin_cos();

        Self {
            x_coeffs: hermite_coeffs(start.x_m(), scale * c0, 0.0, end.x_m(), scale * c1, 0.0),
            y_coeffs: hermite_coeffs(start.y_m(), scale * s0, 0.0, end.y_m(), scale * s1, 0.0),
        }
    }

    /// Evaluate the spline at `t`.
    pub fn point(&self, t: f64) -> SplinePoint {
        let (x, dx, ddx) = eval_poly(&self.x_coeffs, t);
        let (y, dy, ddy) = eval_poly(&self.y_coeffs, t);

        let speed_sq = dx * dx + dy * dy;
        let curvature_radpm = if speed_sq > 0.0 {
            (dx * ddy - ddx * dy) / (speed_sq * speed_sq.sqrt())
        }
        else {
            0.0
        };

        SplinePoint {
            position_m: Vector2::new(x, y),
            course_rad: dy.atan2(dx),
            curvature_radpm,
        }
    }

    /// Subdivide the spline until consecutive points are within the given
    /// step limits, measured in the frame of the earlier point.
    ///
    /// The returned points include both ends of the spline and at least one
    /// point between them.
    pub fn subdivide(
        &self,
        max_dx_m: f64,
        max_dy_m: f64,
        max_dtheta_rad: f64,
    ) -> Result<Vec<SplinePoint>, ConfigError> {
        let mut points = vec![self.point(0.0)];

        // Intervals still to check, the next one to check on top. The spline
        // is always split once so the profile has a point to accelerate
        // through.
        let mut stack = vec![(0.5, 1.0), (0.0, 0.5)];
        let mut iterations = 0;

        while let Some((t0, t1)) = stack.pop() {
            let start = self.point(t0);
            let end = self.point(t1);

            let (dx, dy, dtheta) = Transform2::between(&start.as_pose(), &end.as_pose()).log();

            if dx.abs() > max_dx_m || dy.abs() > max_dy_m || dtheta.abs() > max_dtheta_rad {
                let mid = 0.5 * (t0 + t1);
                stack.push((mid, t1));
                stack.push((t0, mid));
            }
            else {
                points.push(end);
            }

            iterations += 1;
            if iterations >= MAX_SUBDIVISIONS {
                return Err(ConfigError::Invalid {
                    name: "waypoints",
                    reason: String::from(
                        "the path between two waypoints could not be subdivided, check for \
                         waypoints with opposing headings",
                    ),
                });
            }
        }

        Ok(points)
    }
}

impl SplinePoint {
    /// The point as a pose facing along the spline.
    pub fn as_pose(&self) -> Pose2 {
        Pose2::new(self.position_m.x, self.position_m.y, self.course_rad)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Polynomial coefficients for a single axis given the value, first and
/// second derivatives at each end.
fn hermite_coeffs(p0: f64, v0: f64, a0: f64, p1: f64, v1: f64, a1: f64) -> [f64; 6] {
    [
        p0,
        v0,
        0.5 * a0,
        -10.0 * p0 - 6.0 * v0 - 1.5 * a0 + 0.5 * a1 - 4.0 * v1 + 10.0 * p1,
        15.0 * p0 + 8.0 * v0 + 1.5 * a0 - a1 + 7.0 * v1 - 15.0 * p1,
        -6.0 * p0 - 3.0 * v0 - 0.5 * a0 + 0.5 * a1 - 3.0 * v1 + 6.0 * p1,
    ]
}

/// Value, first and second derivative of the polynomial at `t`.
fn eval_poly(c: &[f64; 6], t: f64) -> (f64, f64, f64) {
    let mut value = 0.0;
    let mut d1 = 0.0;
    let mut d2 = 0.0;

    // Horner's method, highest order first
    for k in (0..6).rev() {
        value = value * t + c[k];
        if k >= 1 {
            d1 = d1 * t + k as f64 * c[k];
        }
        if k >= 2 {
            d2 = d2 * t + (k * (k - 1)) as f64 * c[k];
        }
    }

    (value, d1, d2)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_end_conditions() {
        let start = Pose2::from_degrees(1.0, 1.0, 45.0);
        let end = Pose2::from_degrees(4.0, 4.0, 0.0);
        let spline = QuinticSpline::from_poses(&start, &end);

        let p0 = spline.point(0.0);
        let p1 = spline.point(1.0);

        assert_abs_diff_eq!(p0.position_m, start.position_m, epsilon = 1e-12);
        assert_abs_diff_eq!(p1.position_m, end.position_m, epsilon = 1e-12);
        assert_abs_diff_eq!(p0.course_rad, start.heading_rad, epsilon = 1e-12);
        assert_abs_diff_eq!(p1.course_rad, end.heading_rad, epsilon = 1e-12);

        // Zero second derivative at the knots means zero curvature
        assert_abs_diff_eq!(p0.curvature_radpm, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p1.curvature_radpm, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_line() {
        let spline = QuinticSpline::from_poses(&Pose2::new(0.0, 0.0, 0.0), &Pose2::new(2.0, 0.0, 0.0));

        for i in 0..=10 {
            let p = spline.point(i as f64 / 10.0);
            assert_abs_diff_eq!(p.position_m.y, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.course_rad, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.curvature_radpm, 0.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(spline.point(0.5).position_m.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_subdivision_within_limits() {
        let spline = QuinticSpline::from_poses(
            &Pose2::new(0.0, 0.0, 0.0),
            &Pose2::new(3.0, 3.0, FRAC_PI_2),
        );
        let points = spline.subdivide(0.127, 0.00127, 0.0872).unwrap();

        assert!(points.len() > 2);
        assert_abs_diff_eq!(points[0].position_m, Vector2::new(0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(
            points[points.len() - 1].position_m,
            Vector2::new(3.0, 3.0),
            epsilon = 1e-12
        );

        for pair in points.windows(2) {
            let (dx, dy, dtheta) =
                Transform2::between(&pair[0].as_pose(), &pair[1].as_pose()).log();
            assert!(dx.abs() <= 0.127);
            assert!(dy.abs() <= 0.00127);
            assert!(dtheta.abs() <= 0.0872);
        }
    }

    #[test]
    fn test_short_spline_has_interior_point() {
        // Shorter than one step, still split at the middle
        let spline =
            QuinticSpline::from_poses(&Pose2::new(0.0, 0.0, 0.0), &Pose2::new(0.05, 0.0, 0.0));
        let points = spline.subdivide(0.127, 0.00127, 0.0872).unwrap();

        assert_eq!(points.len(), 3);
        assert_abs_diff_eq!(points[1].position_m.x, 0.025, epsilon = 1e-12);
        assert_abs_diff_eq!(points[2].position_m.x, 0.05, epsilon = 1e-12);
    }
}
