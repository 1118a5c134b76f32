//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value between `min` and `max`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Linearly interpolate between `a` and `b`, with `frac` in [0, 1].
pub fn lerp<T>(a: T, b: T, frac: T) -> T
where
    T: Float
{
    a + (b - a) * frac
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t: T = pi_t + pi_t;

    let mut ret = pi_t - rem_euclid(pi_t - value, tau_t);

    // rem_euclid can return exactly tau due to round-off
    if ret <= -pi_t {
        ret = ret + tau_t;
    }

    ret
}

/// Get the shortest signed angular distance from `a` to `b`, in (-pi, pi].
///
/// A positive value means `b` is anticlockwise of `a`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_pi(b - a)
}

/// Interpolate between two angles along the shortest arc.
pub fn lerp_angle<T>(a: T, b: T, frac: T) -> T
where
    T: Float
{
    wrap_pi(a + get_ang_dist(a, b) * frac)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_wrap_pi() {
        assert_eq!(wrap_pi(0f64), 0f64);
        assert_eq!(wrap_pi(PI), PI);
        assert_eq!(wrap_pi(-PI), PI);
        assert!((wrap_pi(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * FRAC_PI_2) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_get_ang_dist() {
        assert!((get_ang_dist(1f64, 2f64) - 1.0).abs() < 1e-12);
        assert!((get_ang_dist(2f64, 1f64) + 1.0).abs() < 1e-12);
        assert!(get_ang_dist(0f64, TAU).abs() < 1e-12);
        assert!((get_ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_lerp_angle_wraps() {
        let mid = lerp_angle(PI - 0.2, -PI + 0.2, 0.5);
        assert!((mid.abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&2f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-2f64, &-1f64, &1f64), -1f64);
    }
}
