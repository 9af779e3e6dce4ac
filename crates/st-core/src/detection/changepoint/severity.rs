//! Severity scoring for detected changes.
//!
//! The primary score compares the means of the old and new regimes: the
//! absolute difference is taken relative to the smaller mean, and ratios
//! above 1 are folded back into [0, 1) via `1 − 1/ratio` so the score
//! saturates instead of overflowing. The result is floored and clamped to
//! [0, 100].
//!
//! A separate piecewise latency magnitude is kept for latency events whose
//! baseline tolerates small absolute jumps on fast paths.

/// Severity of a mean shift, in [0, 100].
pub fn severity(old_mean: f64, new_mean: f64) -> u8 {
    let abs_diff = (old_mean - new_mean).abs();
    if abs_diff == 0.0 {
        return 0;
    }
    let floor = old_mean.min(new_mean);
    let rel_diff = if floor <= 0.0 {
        f64::INFINITY
    } else {
        abs_diff / floor
    };
    let norm = if rel_diff <= 1.0 {
        rel_diff
    } else {
        1.0 - 1.0 / rel_diff
    };
    clamp_to_score(norm)
}

/// Magnitude of a latency change relative to a piecewise baseline.
///
/// Fast paths tolerate small absolute jumps that would look enormous in
/// relative terms: the tolerated jump is half the old latency, but never
/// below 15 ms nor above 100 ms. The excess beyond the baseline maps
/// through the same saturating ratio curve as [`severity`].
pub fn latency_magnitude(old_ms: f64, new_ms: f64) -> u8 {
    let abs_diff = (old_ms - new_ms).abs();
    let baseline = (old_ms / 2.0).clamp(15.0, 100.0);
    if abs_diff <= baseline {
        return 0;
    }
    let rel = (abs_diff - baseline) / baseline;
    let norm = if rel <= 1.0 { rel } else { 1.0 - 1.0 / rel };
    clamp_to_score(norm)
}

fn clamp_to_score(norm: f64) -> u8 {
    if norm.is_nan() {
        return 0;
    }
    (norm * 100.0).floor().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_change_scores_zero() {
        assert_eq!(severity(50.0, 50.0), 0);
    }

    #[test]
    fn test_small_relative_change() {
        // 50 -> 60: abs 10, rel 0.2 -> 20.
        assert_eq!(severity(50.0, 60.0), 20);
        // Symmetric in direction.
        assert_eq!(severity(60.0, 50.0), 20);
    }

    #[test]
    fn test_ratio_folds_above_one() {
        // 50 -> 150: abs 100, rel 2.0 -> 1 - 1/2 = 0.5 -> 50.
        assert_eq!(severity(50.0, 150.0), 50);
        // 50 -> 550: rel 10 -> 1 - 1/10 = 0.9 -> 90.
        assert_eq!(severity(50.0, 550.0), 90);
    }

    #[test]
    fn test_zero_floor_saturates() {
        // A regime mean of zero makes any change maximal.
        assert_eq!(severity(0.0, 10.0), 100);
    }

    #[test]
    fn test_bounds() {
        for (old, new) in [(1.0, 1e9), (1e9, 1.0), (0.001, 0.002), (3.0, 3.0)] {
            let s = severity(old, new);
            assert!(s <= 100);
        }
    }

    #[test]
    fn test_latency_magnitude_within_baseline() {
        // Old 40ms: baseline is max(20, 15) = 20ms; a 10ms jump is noise.
        assert_eq!(latency_magnitude(40.0, 50.0), 0);
        // Fast path: old 10ms, baseline floors at 15ms.
        assert_eq!(latency_magnitude(10.0, 24.0), 0);
    }

    #[test]
    fn test_latency_magnitude_beyond_baseline() {
        // Old 40ms -> 100ms: abs 60, baseline 20, rel (60-20)/20 = 2.0
        // -> 1 - 1/2 = 0.5 -> 50.
        assert_eq!(latency_magnitude(40.0, 100.0), 50);
        // Slow path: baseline capped at 100ms.
        assert!(latency_magnitude(400.0, 700.0) > 0);
    }
}
