//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Scale an integer amount by a multiplicative factor, rounding to the nearest integer.
#[must_use]
pub fn scale_i32(amount: i32, factor: f64) -> i32 {
    round_f64_to_i32(f64::from(amount) * factor)
}

/// Map a unit roll in `[0, 1)` onto an index in `0..len`.
///
/// Returns 0 for empty ranges and non-finite rolls; out-of-range rolls are clamped.
#[must_use]
pub fn unit_to_index(roll: f64, len: usize) -> usize {
    if len == 0 || !roll.is_finite() {
        return 0;
    }
    let span = cast::<usize, f64>(len).unwrap_or(0.0);
    let scaled = (roll.clamp(0.0, 1.0) * span).floor();
    cast::<f64, usize>(scaled).unwrap_or(0).min(len - 1)
}

/// Map a unit roll in `[0, 1)` onto an inclusive integer range.
#[must_use]
pub fn unit_to_range(roll: f64, min: i32, max: i32) -> i32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let width = usize::try_from(i64::from(hi) - i64::from(lo) + 1).unwrap_or(1);
    let offset = i32::try_from(unit_to_index(roll, width)).unwrap_or(0);
    lo.saturating_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_i32(1.6), 2);
        assert_eq!(round_f64_to_i32(f64::NAN), 0);
        assert_eq!(round_f64_to_i32(f64::from(i32::MAX) * 2.0), i32::MAX);
    }

    #[test]
    fn scaling_rounds_protected_damage() {
        assert_eq!(scale_i32(10, 0.25), 3);
        assert_eq!(scale_i32(10, 0.0), 0);
        assert_eq!(scale_i32(7, 1.0), 7);
    }

    #[test]
    fn index_mapping_stays_in_bounds() {
        assert_eq!(unit_to_index(0.0, 4), 0);
        assert_eq!(unit_to_index(0.999, 4), 3);
        assert_eq!(unit_to_index(1.0, 4), 3);
        assert_eq!(unit_to_index(0.5, 0), 0);
        assert_eq!(unit_to_index(f64::NAN, 3), 0);
    }

    #[test]
    fn range_mapping_is_inclusive() {
        assert_eq!(unit_to_range(0.0, 50, 100), 50);
        assert_eq!(unit_to_range(0.9999, 50, 100), 100);
        assert_eq!(unit_to_range(0.5, 100, 50), 75);
    }
}
