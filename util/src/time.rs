//! General time utility functions

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole fine periods that fit in a coarse period.
///
/// Periods are rounded to the nearest integer count, so 0.02 / 0.001 gives
/// 20 despite floating point representation.
pub fn num_sub_periods(coarse_period_s: f64, fine_period_s: f64) -> u64 {
    (coarse_period_s / fine_period_s).round() as u64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }

    #[test]
    fn test_num_sub_periods() {
        assert_eq!(num_sub_periods(0.02, 0.001), 20);
        assert_eq!(num_sub_periods(0.1, 0.02), 5);
    }
}
