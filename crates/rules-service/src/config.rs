//! Rules Engine configuration (spec §9.3).

use std::collections::HashMap;
use std::env;

use common::config::{optional, parse_optional, require, ConfigError};

pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9465";
pub const DEFAULT_CLIENT_ID: &str = "rules-service";
pub const DEFAULT_CONSUMER_GROUP: &str = "rules-service";
pub const DEFAULT_POISON_LIMIT: u32 = 8;
pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HR_VERY_HIGH: f64 = 120.0;
pub const DEFAULT_SPO2_LOW: f64 = 90.0;

#[derive(Clone, Debug)]
pub struct Config {
    pub bootstrap_servers: String,
    pub client_id: String,
    pub consumer_group: String,
    pub metrics_bind_address: String,
    pub poison_limit: u32,
    pub scorer_endpoint: String,
    pub scorer_timeout_ms: u64,
    /// R4 constant: heart rate considered "very high" regardless of
    /// per-patient thresholds (spec §4.4).
    pub hr_very_high: f64,
    /// R4 constant: oxygen saturation considered "low" regardless of
    /// per-patient thresholds (spec §4.4).
    pub spo2_low: f64,
}

impl Config {
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or malformed.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bootstrap_servers = require(vars, "RULES_KAFKA_BOOTSTRAP_SERVERS")?;
        let client_id = optional(vars, "RULES_CLIENT_ID", DEFAULT_CLIENT_ID);
        let consumer_group = optional(vars, "RULES_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP);
        let metrics_bind_address =
            optional(vars, "RULES_METRICS_BIND_ADDRESS", DEFAULT_METRICS_BIND_ADDRESS);
        let poison_limit = parse_optional(vars, "RULES_POISON_LIMIT", DEFAULT_POISON_LIMIT)?;
        let scorer_endpoint = require(vars, "RULES_SCORER_ENDPOINT")?;
        let scorer_timeout_ms = parse_optional(vars, "RULES_SCORER_TIMEOUT_MS", DEFAULT_SCORER_TIMEOUT_MS)?;
        let hr_very_high = parse_optional(vars, "RULES_HR_VERY_HIGH", DEFAULT_HR_VERY_HIGH)?;
        let spo2_low = parse_optional(vars, "RULES_SPO2_LOW", DEFAULT_SPO2_LOW)?;

        Ok(Self {
            bootstrap_servers,
            client_id,
            consumer_group,
            metrics_bind_address,
            poison_limit,
            scorer_endpoint,
            scorer_timeout_ms,
            hr_very_high,
            spo2_low,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn missing_required_vars_error() {
        assert!(Config::from_vars(&vars(&[])).is_err());
    }

    #[test]
    fn r4_constants_default_per_spec() {
        let config = Config::from_vars(&vars(&[
            ("RULES_KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            ("RULES_SCORER_ENDPOINT", "http://localhost:50062"),
        ]))
        .unwrap();
        assert_eq!(config.hr_very_high, 120.0);
        assert_eq!(config.spo2_low, 90.0);
    }
}
