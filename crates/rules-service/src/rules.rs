//! Fixed rule set R1-R4 (spec §4.4 step 2).

use std::collections::HashMap;

use telemetry_protocol::envelope::{ThresholdProfile, TriggeredRule};
use telemetry_protocol::measurement::{metric, Vital};
use telemetry_protocol::severity::Severity;

/// Evaluate the fixed rule set against present vitals and (if available)
/// the patient's threshold profile. Rules R1-R3 require thresholds; R4
/// uses fixed constants and needs only the two vitals it compares.
#[must_use]
pub fn evaluate(
    vitals: &HashMap<String, Vital>,
    thresholds: Option<&ThresholdProfile>,
    hr_very_high: f64,
    spo2_low: f64,
) -> Vec<TriggeredRule> {
    let mut triggered = Vec::new();

    if let Some(thresholds) = thresholds {
        if let Some(hr) = vitals.get(metric::HEART_RATE) {
            if hr.value > thresholds.heart_rate.max {
                triggered.push(TriggeredRule {
                    rule_id: "R1".to_string(),
                    metric: metric::HEART_RATE.to_string(),
                    observed_value: hr.value,
                    severity: Severity::Warning,
                });
            }
        }

        if let Some(spo2) = vitals.get(metric::OXYGEN_SATURATION) {
            if spo2.value < thresholds.oxygen_saturation.min {
                triggered.push(TriggeredRule {
                    rule_id: "R2".to_string(),
                    metric: metric::OXYGEN_SATURATION.to_string(),
                    observed_value: spo2.value,
                    severity: Severity::Critical,
                });
            }
        }

        if let Some(temp) = vitals.get(metric::TEMPERATURE) {
            if temp.value > thresholds.temperature.max {
                triggered.push(TriggeredRule {
                    rule_id: "R3".to_string(),
                    metric: metric::TEMPERATURE.to_string(),
                    observed_value: temp.value,
                    severity: Severity::Warning,
                });
            }
        }
    }

    if let (Some(hr), Some(spo2)) = (vitals.get(metric::HEART_RATE), vitals.get(metric::OXYGEN_SATURATION)) {
        if hr.value > hr_very_high && spo2.value < spo2_low {
            triggered.push(TriggeredRule {
                rule_id: "R4".to_string(),
                metric: metric::HEART_RATE.to_string(),
                observed_value: hr.value,
                severity: Severity::Critical,
            });
        }
    }

    triggered
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use telemetry_protocol::envelope::{BloodPressureRange, Range};
    use telemetry_protocol::measurement::TemperatureAwareUnit;

    fn vital(value: f64, unit: TemperatureAwareUnit) -> Vital {
        Vital { value, unit, timestamp: chrono::Utc::now() }
    }

    fn thresholds() -> ThresholdProfile {
        ThresholdProfile {
            heart_rate: Range { min: 60.0, max: 100.0 },
            blood_pressure: BloodPressureRange {
                systolic: Range { min: 90.0, max: 140.0 },
                diastolic: Range { min: 60.0, max: 90.0 },
            },
            temperature: Range { min: 36.0, max: 37.5 },
            oxygen_saturation: Range { min: 95.0, max: 100.0 },
            respiratory_rate: Range { min: 12.0, max: 20.0 },
        }
    }

    #[test]
    fn r1_fires_when_heart_rate_exceeds_max() {
        let mut vitals = HashMap::new();
        vitals.insert(metric::HEART_RATE.to_string(), vital(110.0, TemperatureAwareUnit::Bpm));
        let triggered = evaluate(&vitals, Some(&thresholds()), 120.0, 90.0);
        assert!(triggered.iter().any(|r| r.rule_id == "R1"));
    }

    #[test]
    fn r2_fires_as_critical_when_spo2_below_min() {
        let mut vitals = HashMap::new();
        vitals.insert(metric::OXYGEN_SATURATION.to_string(), vital(92.0, TemperatureAwareUnit::Percent));
        let triggered = evaluate(&vitals, Some(&thresholds()), 120.0, 90.0);
        let r2 = triggered.iter().find(|r| r.rule_id == "R2").unwrap();
        assert_eq!(r2.severity, Severity::Critical);
    }

    #[test]
    fn r4_requires_both_conditions() {
        let mut vitals = HashMap::new();
        vitals.insert(metric::HEART_RATE.to_string(), vital(130.0, TemperatureAwareUnit::Bpm));
        vitals.insert(metric::OXYGEN_SATURATION.to_string(), vital(98.0, TemperatureAwareUnit::Percent));
        let triggered = evaluate(&vitals, None, 120.0, 90.0);
        assert!(!triggered.iter().any(|r| r.rule_id == "R4"));
    }

    #[test]
    fn r4_fires_on_combined_breach_without_thresholds() {
        let mut vitals = HashMap::new();
        vitals.insert(metric::HEART_RATE.to_string(), vital(130.0, TemperatureAwareUnit::Bpm));
        vitals.insert(metric::OXYGEN_SATURATION.to_string(), vital(85.0, TemperatureAwareUnit::Percent));
        let triggered = evaluate(&vitals, None, 120.0, 90.0);
        assert!(triggered.iter().any(|r| r.rule_id == "R4" && r.severity == Severity::Critical));
    }

    #[test]
    fn no_thresholds_skips_r1_through_r3() {
        let mut vitals = HashMap::new();
        vitals.insert(metric::HEART_RATE.to_string(), vital(500.0, TemperatureAwareUnit::Bpm));
        let triggered = evaluate(&vitals, None, 120.0, 90.0);
        assert!(triggered.is_empty());
    }
}
