//! Enricher service configuration (spec §9.3).

use std::collections::HashMap;
use std::env;

use common::config::{optional, parse_optional, require, ConfigError};

pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9464";
pub const DEFAULT_CLIENT_ID: &str = "enricher-service";
pub const DEFAULT_CONSUMER_GROUP: &str = "enricher-service";
pub const DEFAULT_POISON_LIMIT: u32 = 8;
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Debug)]
pub struct Config {
    pub bootstrap_servers: String,
    pub client_id: String,
    pub consumer_group: String,
    pub metrics_bind_address: String,
    pub poison_limit: u32,
    pub registry_endpoint: String,
    pub registry_timeout_ms: u64,
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
        let bootstrap_servers = require(vars, "ENRICHER_KAFKA_BOOTSTRAP_SERVERS")?;
        let client_id = optional(vars, "ENRICHER_CLIENT_ID", DEFAULT_CLIENT_ID);
        let consumer_group = optional(vars, "ENRICHER_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP);
        let metrics_bind_address =
            optional(vars, "ENRICHER_METRICS_BIND_ADDRESS", DEFAULT_METRICS_BIND_ADDRESS);
        let poison_limit = parse_optional(vars, "ENRICHER_POISON_LIMIT", DEFAULT_POISON_LIMIT)?;
        let registry_endpoint = require(vars, "ENRICHER_REGISTRY_ENDPOINT")?;
        let registry_timeout_ms =
            parse_optional(vars, "ENRICHER_REGISTRY_TIMEOUT_MS", DEFAULT_REGISTRY_TIMEOUT_MS)?;

        Ok(Self {
            bootstrap_servers,
            client_id,
            consumer_group,
            metrics_bind_address,
            poison_limit,
            registry_endpoint,
            registry_timeout_ms,
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
    fn defaults_apply() {
        let config = Config::from_vars(&vars(&[
            ("ENRICHER_KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            ("ENRICHER_REGISTRY_ENDPOINT", "http://localhost:50061"),
        ]))
        .unwrap();
        assert_eq!(config.registry_timeout_ms, DEFAULT_REGISTRY_TIMEOUT_MS);
        assert_eq!(config.poison_limit, DEFAULT_POISON_LIMIT);
    }
}
