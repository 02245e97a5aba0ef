//! Gateway service configuration (spec §9.3).

use std::collections::HashMap;
use std::env;
use std::fmt;

use common::config::{optional, parse_optional, require, ConfigError};

pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8081";
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50060";
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9460";
pub const DEFAULT_CLIENT_ID: &str = "gateway-service";
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_DEVICE_VERIFICATION_ENABLED: bool = true;

#[derive(Clone)]
pub struct Config {
    pub http_bind_address: String,
    pub grpc_bind_address: String,
    pub metrics_bind_address: String,
    pub bootstrap_servers: String,
    pub client_id: String,
    /// Registry endpoint, e.g. `http://registry:50061`. Absent disables
    /// device verification entirely (treated the same as Registry being
    /// unreachable: the Gateway fails open, per spec §4.1).
    pub registry_endpoint: Option<String>,
    pub registry_timeout_ms: u64,
    /// Whether device verification against the Registry is attempted at
    /// all. When false, every submission is accepted without a lookup.
    pub device_verification_enabled: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("http_bind_address", &self.http_bind_address)
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("metrics_bind_address", &self.metrics_bind_address)
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("client_id", &self.client_id)
            .field("registry_endpoint", &self.registry_endpoint)
            .field("registry_timeout_ms", &self.registry_timeout_ms)
            .field("device_verification_enabled", &self.device_verification_enabled)
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
        let http_bind_address = optional(vars, "GATEWAY_HTTP_BIND_ADDRESS", DEFAULT_HTTP_BIND_ADDRESS);
        let grpc_bind_address = optional(vars, "GATEWAY_GRPC_BIND_ADDRESS", DEFAULT_GRPC_BIND_ADDRESS);
        let metrics_bind_address =
            optional(vars, "GATEWAY_METRICS_BIND_ADDRESS", DEFAULT_METRICS_BIND_ADDRESS);
        let bootstrap_servers = require(vars, "GATEWAY_KAFKA_BOOTSTRAP_SERVERS")?;
        let client_id = optional(vars, "GATEWAY_CLIENT_ID", DEFAULT_CLIENT_ID);
        let registry_endpoint = vars.get("GATEWAY_REGISTRY_ENDPOINT").cloned();
        let registry_timeout_ms =
            parse_optional(vars, "GATEWAY_REGISTRY_TIMEOUT_MS", DEFAULT_REGISTRY_TIMEOUT_MS)?;
        let device_verification_enabled = parse_optional(
            vars,
            "GATEWAY_DEVICE_VERIFICATION_ENABLED",
            DEFAULT_DEVICE_VERIFICATION_ENABLED,
        )?;

        Ok(Self {
            http_bind_address,
            grpc_bind_address,
            metrics_bind_address,
            bootstrap_servers,
            client_id,
            registry_endpoint,
            registry_timeout_ms,
            device_verification_enabled,
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
    fn missing_bootstrap_servers_errors() {
        let result = Config::from_vars(&vars(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "GATEWAY_KAFKA_BOOTSTRAP_SERVERS"));
    }

    #[test]
    fn defaults_apply() {
        let config =
            Config::from_vars(&vars(&[("GATEWAY_KAFKA_BOOTSTRAP_SERVERS", "localhost:9092")]))
                .unwrap();
        assert_eq!(config.http_bind_address, DEFAULT_HTTP_BIND_ADDRESS);
        assert_eq!(config.grpc_bind_address, DEFAULT_GRPC_BIND_ADDRESS);
        assert!(config.registry_endpoint.is_none());
        assert!(config.device_verification_enabled);
    }

    #[test]
    fn registry_endpoint_absent_means_verification_has_nothing_to_call() {
        let config =
            Config::from_vars(&vars(&[("GATEWAY_KAFKA_BOOTSTRAP_SERVERS", "localhost:9092")]))
                .unwrap();
        assert!(config.registry_endpoint.is_none());
    }
}
