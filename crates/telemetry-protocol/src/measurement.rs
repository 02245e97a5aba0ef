//! Canonical measurement types, metric name aliasing, and clamp windows
//! (spec §3 Measurement, §4.2 Normalizer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical metric name. Stored as a plain `String` on the wire (so unknown
/// metrics round-trip through the Gateway/raw topic) but validated against
/// this set by the Normalizer.
pub mod metric {
    /// Heart rate, beats per minute.
    pub const HEART_RATE: &str = "heart_rate";
    /// Oxygen saturation, percent.
    pub const OXYGEN_SATURATION: &str = "oxygen_saturation";
    /// Temperature, Celsius or Fahrenheit (unit is explicit on the vital).
    pub const TEMPERATURE: &str = "temperature";
}

/// Map a raw metric name (already lower-cased) to its canonical form.
///
/// Returns `None` for metrics with no known mapping; the Normalizer drops
/// these with a warning (spec §4.2 step 1).
#[must_use]
pub fn canonicalize_metric_name(raw: &str) -> Option<&'static str> {
    match raw {
        "heart_rate" | "hr" | "heartrate" | "pulse" => Some(metric::HEART_RATE),
        "oxygen_saturation" | "spo2" | "o2sat" | "o2" => Some(metric::OXYGEN_SATURATION),
        "temperature" | "temp" | "body_temp" => Some(metric::TEMPERATURE),
        _ => None,
    }
}

/// A single as-submitted measurement: `{metric, value, unit}` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// Raw metric name as submitted (alias or canonical).
    pub metric: String,
    /// Numeric value as submitted.
    pub value: f64,
    /// Unit as submitted (e.g. `"bpm"`, `"percent"`, `"fahrenheit"`, `"celsius"`).
    pub unit: String,
}

/// A normalized vital: canonical value, canonical unit, and its own
/// timestamp, after clamping (spec §3 `NormalizedTelemetry.vitals`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vital {
    /// Clamped, canonical-unit value.
    pub value: f64,
    /// Canonical unit for this metric (temperature keeps the submitted unit).
    pub unit: TemperatureAwareUnit,
    /// Per-vital timestamp (normalized to UTC millisecond ISO-8601 upstream).
    pub timestamp: DateTime<Utc>,
}

/// Unit tag that distinguishes Fahrenheit from Celsius for temperature while
/// every other metric has one fixed canonical unit (spec §9 Open Question:
/// implementers must not silently convert between temperature units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureAwareUnit {
    /// Beats per minute (`heart_rate`).
    Bpm,
    /// Percent (`oxygen_saturation`).
    Percent,
    /// Degrees Celsius (`temperature`, as submitted).
    Celsius,
    /// Degrees Fahrenheit (`temperature`, as submitted).
    Fahrenheit,
}

impl TemperatureAwareUnit {
    /// Resolve the canonical unit for a metric, given the submitted unit
    /// string (only meaningful for temperature, which has two valid units).
    #[must_use]
    pub fn for_metric(canonical_metric: &str, submitted_unit: &str) -> Option<Self> {
        match canonical_metric {
            metric::HEART_RATE => Some(Self::Bpm),
            metric::OXYGEN_SATURATION => Some(Self::Percent),
            metric::TEMPERATURE => {
                let lower = submitted_unit.to_ascii_lowercase();
                if lower.starts_with('f') {
                    Some(Self::Fahrenheit)
                } else {
                    // Default to Celsius when the unit is ambiguous/missing,
                    // matching a clinical-grade device's common default.
                    Some(Self::Celsius)
                }
            }
            _ => None,
        }
    }
}

/// The physiological clamp window for a canonical metric (spec §4.2 step 3).
///
/// Temperature's window depends on the declared unit: Celsius uses
/// `[30, 45]`; Fahrenheit uses the analogous window `[86, 113]`.
#[must_use]
pub fn clamp_window(canonical_metric: &str, unit: TemperatureAwareUnit) -> Option<(f64, f64)> {
    match canonical_metric {
        metric::HEART_RATE => Some((20.0, 240.0)),
        metric::OXYGEN_SATURATION => Some((50.0, 100.0)),
        metric::TEMPERATURE => match unit {
            TemperatureAwareUnit::Celsius => Some((30.0, 45.0)),
            TemperatureAwareUnit::Fahrenheit => Some((86.0, 113.0)),
            _ => None,
        },
        _ => None,
    }
}

/// Clamp `value` into `[min, max]`, returning the clamped value and whether
/// clamping actually changed it.
#[must_use]
pub fn clamp(value: f64, min: f64, max: f64) -> (f64, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_known_aliases() {
        assert_eq!(canonicalize_metric_name("hr"), Some(metric::HEART_RATE));
        assert_eq!(canonicalize_metric_name("heartrate"), Some(metric::HEART_RATE));
        assert_eq!(canonicalize_metric_name("pulse"), Some(metric::HEART_RATE));
        assert_eq!(
            canonicalize_metric_name("spo2"),
            Some(metric::OXYGEN_SATURATION)
        );
        assert_eq!(
            canonicalize_metric_name("o2sat"),
            Some(metric::OXYGEN_SATURATION)
        );
        assert_eq!(canonicalize_metric_name("temp"), Some(metric::TEMPERATURE));
        assert_eq!(
            canonicalize_metric_name("body_temp"),
            Some(metric::TEMPERATURE)
        );
    }

    #[test]
    fn rejects_unknown_metric() {
        assert_eq!(canonicalize_metric_name("blood_pressure"), None);
    }

    #[test]
    fn temperature_unit_preserved_not_converted() {
        let f = TemperatureAwareUnit::for_metric(metric::TEMPERATURE, "fahrenheit").unwrap();
        let c = TemperatureAwareUnit::for_metric(metric::TEMPERATURE, "celsius").unwrap();
        assert_eq!(f, TemperatureAwareUnit::Fahrenheit);
        assert_eq!(c, TemperatureAwareUnit::Celsius);
    }

    #[test]
    fn clamp_window_differs_by_temperature_unit() {
        let celsius = clamp_window(metric::TEMPERATURE, TemperatureAwareUnit::Celsius).unwrap();
        let fahrenheit =
            clamp_window(metric::TEMPERATURE, TemperatureAwareUnit::Fahrenheit).unwrap();
        assert_eq!(celsius, (30.0, 45.0));
        assert_eq!(fahrenheit, (86.0, 113.0));
    }

    #[test]
    fn heart_rate_clamps_to_bounds() {
        let (value, clamped) = clamp(500.0, 20.0, 240.0);
        assert_eq!(value, 240.0);
        assert!(clamped);
    }

    #[test]
    fn in_range_value_is_not_clamped() {
        let (value, clamped) = clamp(72.0, 20.0, 240.0);
        assert_eq!(value, 72.0);
        assert!(!clamped);
    }
}
