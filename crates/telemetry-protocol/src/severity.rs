//! Severity ordering shared by the Rules Engine and the Anomaly Scorer
//! (spec §4.4 step 3, §4.5 z-score mapping table).

use serde::{Deserialize, Serialize};

/// Severity levels in ascending order: `ok < low < medium < warning < high <
/// critical`. `normal` (the scorer's own vocabulary) maps to `Ok`, and
/// `warning` (the rules engine's own vocabulary) subsumes `medium` per
/// spec §4.4 step 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No concern.
    Ok,
    /// Mild deviation.
    Low,
    /// Moderate deviation.
    Medium,
    /// Threshold breach (rules vocabulary).
    Warning,
    /// Strong anomaly (scorer vocabulary).
    High,
    /// Severe anomaly or dangerous threshold breach.
    Critical,
}

impl Severity {
    /// Map a scorer-reported z-score severity label (`normal`, `low`,
    /// `medium`, `high`, `critical`) into the shared ordering.
    #[must_use]
    pub fn from_scorer_label(label: &str) -> Self {
        match label {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Ok,
        }
    }

    /// Map an anomaly score in `[0.0, 1.0]` to a severity per the z-score
    /// mapping table in spec §4.5.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < 0.20 {
            Severity::Ok
        } else if score < 0.40 {
            Severity::Low
        } else if score < 0.60 {
            Severity::Medium
        } else if score < 0.80 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    /// Highest of two severities, using the shared total order.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Highest severity across an iterator, defaulting to `Ok` when empty.
    #[must_use]
    pub fn max_of<I: IntoIterator<Item = Severity>>(severities: I) -> Self {
        severities
            .into_iter()
            .fold(Severity::Ok, Severity::max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec() {
        assert!(Severity::Ok < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::Warning);
        assert!(Severity::Warning < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn from_score_matches_z_score_table_boundaries() {
        assert_eq!(Severity::from_score(0.0), Severity::Ok);
        assert_eq!(Severity::from_score(0.19), Severity::Ok);
        assert_eq!(Severity::from_score(0.20), Severity::Low);
        assert_eq!(Severity::from_score(0.39), Severity::Low);
        assert_eq!(Severity::from_score(0.40), Severity::Medium);
        assert_eq!(Severity::from_score(0.59), Severity::Medium);
        assert_eq!(Severity::from_score(0.60), Severity::High);
        assert_eq!(Severity::from_score(0.79), Severity::High);
        assert_eq!(Severity::from_score(0.80), Severity::Critical);
        assert_eq!(Severity::from_score(1.0), Severity::Critical);
    }

    #[test]
    fn max_picks_higher_severity() {
        assert_eq!(Severity::Ok.max(Severity::Warning), Severity::Warning);
        assert_eq!(Severity::Critical.max(Severity::High), Severity::Critical);
    }

    #[test]
    fn max_of_empty_iterator_is_ok() {
        let empty: Vec<Severity> = vec![];
        assert_eq!(Severity::max_of(empty), Severity::Ok);
    }

    #[test]
    fn max_of_picks_overall_highest() {
        let severities = vec![Severity::Low, Severity::Critical, Severity::Medium];
        assert_eq!(Severity::max_of(severities), Severity::Critical);
    }
}
