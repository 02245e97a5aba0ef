//! Rolling per-`(patient_id, metric)` baseline math (spec §4.5, §3 Scorer state).

/// Minimum sample count before z-score scoring is trusted; below this the
/// scorer falls back to a bootstrap score.
pub const MIN_SAMPLES: u64 = 10;

/// Default ring-buffer window size.
pub const DEFAULT_WINDOW: u64 = 100;

/// Floor for standard deviation to avoid division by zero.
const STDDEV_EPSILON: f64 = 1e-6;

/// A snapshot of a baseline's running statistics, as returned by the store
/// *before* the current sample is folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineSnapshot {
    pub count: u64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl BaselineSnapshot {
    #[must_use]
    pub fn empty() -> Self {
        Self { count: 0, sum: 0.0, sum_sq: 0.0 }
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population standard deviation, floored at [`STDDEV_EPSILON`].
    #[must_use]
    pub fn stddev(&self) -> f64 {
        if self.count == 0 {
            return STDDEV_EPSILON;
        }
        let mean = self.mean();
        let variance = (self.sum_sq / self.count as f64) - mean * mean;
        variance.max(0.0).sqrt().max(STDDEV_EPSILON)
    }

    /// Absolute z-score of `value` against this snapshot.
    #[must_use]
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean()).abs() / self.stddev()
    }
}

/// Bootstrap anomaly score used while a baseline has fewer than
/// [`MIN_SAMPLES`] observations: linear in how far `value` lies outside
/// `[soft_min, soft_max]`, clamped to `[0.2, 0.5]` (spec §4.5 step 2).
#[must_use]
pub fn bootstrap_score(value: f64, soft_min: f64, soft_max: f64) -> f64 {
    if value >= soft_min && value <= soft_max {
        return 0.2;
    }
    let span = (soft_max - soft_min).max(STDDEV_EPSILON);
    let overshoot = if value < soft_min { soft_min - value } else { value - soft_max };
    let fraction = (overshoot / span).min(1.0);
    0.2 + fraction * 0.3
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_zero_mean_and_floored_stddev() {
        let snapshot = BaselineSnapshot::empty();
        assert_eq!(snapshot.mean(), 0.0);
        assert_eq!(snapshot.stddev(), STDDEV_EPSILON);
    }

    #[test]
    fn snapshot_computes_mean_and_stddev() {
        // values: 70, 72, 74 -> mean 72, population variance = ((4+0+4)/3) = 8/3
        let snapshot = BaselineSnapshot { count: 3, sum: 216.0, sum_sq: 15_560.0 };
        assert!((snapshot.mean() - 72.0).abs() < 1e-9);
        assert!((snapshot.stddev() - (8.0_f64 / 3.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn z_score_zero_at_mean() {
        let snapshot = BaselineSnapshot { count: 10, sum: 700.0, sum_sq: 49_050.0 };
        assert!(snapshot.z_score(70.0) < 1.0);
    }

    #[test]
    fn bootstrap_score_within_soft_range_is_floor() {
        assert_eq!(bootstrap_score(75.0, 60.0, 100.0), 0.2);
    }

    #[test]
    fn bootstrap_score_grows_with_overshoot() {
        let near = bootstrap_score(101.0, 60.0, 100.0);
        let far = bootstrap_score(160.0, 60.0, 100.0);
        assert!(near > 0.2);
        assert!(far >= near);
        assert!(far <= 0.5);
    }
}
