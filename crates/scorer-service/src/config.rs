//! Scorer service configuration (spec §9.3).

use std::collections::HashMap;
use std::env;
use std::fmt;

use common::config::{optional, parse_optional, ConfigError};

pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50062";
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9462";

/// Default for the spec §9 open question on scorer baseline dedupe.
pub const DEFAULT_DEDUPE_BY_EVENT_ID: bool = false;

#[derive(Clone)]
pub struct Config {
    pub redis_url: Option<String>,
    pub grpc_bind_address: String,
    pub metrics_bind_address: String,
    pub dedupe_by_event_id: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("metrics_bind_address", &self.metrics_bind_address)
            .field("dedupe_by_event_id", &self.dedupe_by_event_id)
            .finish()
    }
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
        let redis_url = vars.get("SCORER_REDIS_URL").cloned();
        let grpc_bind_address = optional(vars, "SCORER_GRPC_BIND_ADDRESS", DEFAULT_GRPC_BIND_ADDRESS);
        let metrics_bind_address =
            optional(vars, "SCORER_METRICS_BIND_ADDRESS", DEFAULT_METRICS_BIND_ADDRESS);
        let dedupe_by_event_id = parse_optional(
            vars,
            "SCORER_DEDUPE_BY_EVENT_ID",
            DEFAULT_DEDUPE_BY_EVENT_ID,
        )?;

        Ok(Self { redis_url, grpc_bind_address, metrics_bind_address, dedupe_by_event_id })
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
    fn redis_url_absent_defaults_to_in_process_only() {
        let config = Config::from_vars(&vars(&[])).unwrap();
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn defaults_apply_for_bind_addresses() {
        let config = Config::from_vars(&vars(&[])).unwrap();
        assert_eq!(config.grpc_bind_address, DEFAULT_GRPC_BIND_ADDRESS);
        assert_eq!(config.metrics_bind_address, DEFAULT_METRICS_BIND_ADDRESS);
    }
}
