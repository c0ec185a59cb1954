//! Nearest-measure snapping.

/// Fractional digits kept in cut plans.
pub const PLAN_PRECISION_DIGITS: usize = 6;

const PLAN_SCALE: f64 = 1_000_000.0;

/// Replace `t` with the measure closest to it.
///
/// `measures` must be sorted ascending. On an exact tie the earlier measure
/// wins. With no measures `t` is returned unchanged.
///
/// # Examples
/// ```
/// use bounce_align::snap_to_measure;
/// let measures = [0.0, 3.0, 6.0];
/// assert_eq!(snap_to_measure(4.4, &measures), 3.0);
/// assert_eq!(snap_to_measure(4.5, &measures), 3.0);
/// assert_eq!(snap_to_measure(4.6, &measures), 6.0);
/// ```
pub fn snap_to_measure(t: f64, measures: &[f64]) -> f64 {
    nearest_index(t, measures).map_or(t, |i| measures[i])
}

/// Index of the measure closest to `t`, earlier index on ties.
pub fn nearest_index(t: f64, measures: &[f64]) -> Option<usize> {
    if measures.is_empty() {
        return None;
    }

    // First measure >= t.
    let upper = measures.partition_point(|&m| m < t);
    if upper == 0 {
        return Some(0);
    }
    if upper == measures.len() {
        return Some(measures.len() - 1);
    }

    let lower = upper - 1;
    if t - measures[lower] <= measures[upper] - t {
        Some(lower)
    } else {
        Some(upper)
    }
}

/// Round to the plan's fixed precision (1 µs).
pub fn quantize(t: f64) -> f64 {
    (t * PLAN_SCALE).round() / PLAN_SCALE
}

/// Whether two timestamps are equal at plan precision.
pub fn same_at_precision(a: f64, b: f64) -> bool {
    (a * PLAN_SCALE).round() == (b * PLAN_SCALE).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear scan used as the reference for the binary search.
    fn brute_force(t: f64, measures: &[f64]) -> f64 {
        let mut best = measures[0];
        for &m in measures {
            if (m - t).abs() < (best - t).abs() {
                best = m;
            }
        }
        best
    }

    #[test]
    fn test_snap_matches_linear_scan() {
        let measures = [0.0, 1.7, 3.0, 3.1, 6.5, 9.0, 12.25];
        let mut t = -1.0;
        while t < 14.0 {
            assert_eq!(snap_to_measure(t, &measures), brute_force(t, &measures), "t = {}", t);
            t += 0.05;
        }
    }

    #[test]
    fn test_tie_prefers_earlier() {
        let measures = [0.0, 2.0, 4.0];
        assert_eq!(snap_to_measure(1.0, &measures), 0.0);
        assert_eq!(snap_to_measure(3.0, &measures), 2.0);
        assert_eq!(nearest_index(3.0, &measures), Some(1));
    }

    #[test]
    fn test_out_of_range_clamps_to_ends() {
        let measures = [2.0, 4.0];
        assert_eq!(snap_to_measure(-5.0, &measures), 2.0);
        assert_eq!(snap_to_measure(100.0, &measures), 4.0);
    }

    #[test]
    fn test_empty_measures_pass_through() {
        assert_eq!(snap_to_measure(7.25, &[]), 7.25);
        assert_eq!(nearest_index(7.25, &[]), None);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(1.23456789), 1.234568);
        assert!(same_at_precision(5.0, 5.0000004));
        assert!(!same_at_precision(5.0, 5.000001));
    }
}
