/// Linear interpolation between closest ranks: `rank = p/100 * (n - 1)`.
/// Sorts `values` in place. Returns 0.0 for an empty slice.
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(values, p)
}

/// Same as [`percentile`] for a slice the caller already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Report-only ratio; a non-positive denominator yields the 0.0 sentinel instead of a fault.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn deciles() -> Vec<f64> {
        (1..=10).map(|v| v as f64 * 10.0).collect()
    }

    #[test]
    fn percentile_interpolates_linearly_between_ranks() {
        let mut values = deciles();
        assert_approx(percentile(&mut values, 50.0), 55.0);
        assert_approx(percentile(&mut values, 10.0), 19.0);
        assert_approx(percentile(&mut values, 90.0), 91.0);
        assert_approx(percentile(&mut values, 25.0), 32.5);
        assert_approx(percentile(&mut values, 0.0), 10.0);
        assert_approx(percentile(&mut values, 100.0), 100.0);
    }

    #[test]
    fn percentile_sorts_unordered_input() {
        let mut values = vec![90.0, 10.0, 50.0, 30.0, 70.0];
        assert_approx(percentile(&mut values, 50.0), 50.0);
        assert_eq!(values, vec![10.0, 30.0, 50.0, 70.0, 90.0]);
    }

    #[test]
    fn percentile_handles_empty_and_single_inputs() {
        assert_approx(percentile(&mut [], 50.0), 0.0);
        assert_approx(percentile(&mut [42.0], 10.0), 42.0);
    }

    #[test]
    fn mean_of_empty_slice_is_zero() {
        assert_approx(mean(&[]), 0.0);
        assert_approx(mean(&deciles()), 55.0);
    }

    #[test]
    fn ratio_or_zero_substitutes_sentinel_for_degenerate_denominator() {
        assert_approx(ratio_or_zero(50.0, 200.0), 0.25);
        assert_approx(ratio_or_zero(50.0, 0.0), 0.0);
        assert_approx(ratio_or_zero(50.0, -10.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_percentile_stays_within_sample_range(
            raw in proptest::collection::vec(0u32..1_000_000, 1..64),
            p in 0u32..=100
        ) {
            let mut values = raw.iter().map(|v| *v as f64).collect::<Vec<_>>();
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let v = percentile(&mut values, p as f64);
            prop_assert!(v >= lo - EPS && v <= hi + EPS);
        }
    }
}
