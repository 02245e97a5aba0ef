//! Normalizer service configuration (spec §9.3).

use std::collections::HashMap;
use std::env;

use common::config::{optional, parse_optional, require, ConfigError};

pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9463";
pub const DEFAULT_CLIENT_ID: &str = "normalizer-service";
pub const DEFAULT_CONSUMER_GROUP: &str = "normalizer-service";
pub const DEFAULT_POISON_LIMIT: u32 = 8;

#[derive(Clone, Debug)]
pub struct Config {
    pub bootstrap_servers: String,
    pub client_id: String,
    pub consumer_group: String,
    pub metrics_bind_address: String,
    pub poison_limit: u32,
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
        let bootstrap_servers = require(vars, "NORMALIZER_KAFKA_BOOTSTRAP_SERVERS")?;
        let client_id = optional(vars, "NORMALIZER_CLIENT_ID", DEFAULT_CLIENT_ID);
        let consumer_group = optional(vars, "NORMALIZER_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP);
        let metrics_bind_address =
            optional(vars, "NORMALIZER_METRICS_BIND_ADDRESS", DEFAULT_METRICS_BIND_ADDRESS);
        let poison_limit = parse_optional(vars, "NORMALIZER_POISON_LIMIT", DEFAULT_POISON_LIMIT)?;

        Ok(Self { bootstrap_servers, client_id, consumer_group, metrics_bind_address, poison_limit })
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
    fn missing_bootstrap_servers_errors() {
        let result = Config::from_vars(&vars(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn defaults_apply() {
        let config =
            Config::from_vars(&vars(&[("NORMALIZER_KAFKA_BOOTSTRAP_SERVERS", "localhost:9092")]))
                .unwrap();
        assert_eq!(config.consumer_group, DEFAULT_CONSUMER_GROUP);
        assert_eq!(config.poison_limit, DEFAULT_POISON_LIMIT);
    }
}
