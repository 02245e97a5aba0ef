//! Registry service configuration (spec §9.3).

use std::collections::HashMap;
use std::env;
use std::fmt;

use common::config::{optional, require, ConfigError};

/// Default gRPC bind address.
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50061";

/// Default Prometheus metrics bind address.
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9461";

/// Registry service configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub grpc_bind_address: String,
    pub metrics_bind_address: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("metrics_bind_address", &self.metrics_bind_address)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from an explicit map (used in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = require(vars, "DATABASE_URL")?;
        let grpc_bind_address =
            optional(vars, "REGISTRY_GRPC_BIND_ADDRESS", DEFAULT_GRPC_BIND_ADDRESS);
        let metrics_bind_address = optional(
            vars,
            "REGISTRY_METRICS_BIND_ADDRESS",
            DEFAULT_METRICS_BIND_ADDRESS,
        );

        Ok(Self {
            database_url,
            grpc_bind_address,
            metrics_bind_address,
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
    fn missing_database_url_errors() {
        let err = Config::from_vars(&vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "DATABASE_URL"));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = Config::from_vars(&vars(&[("DATABASE_URL", "postgres://x/y")])).unwrap();
        assert_eq!(config.grpc_bind_address, DEFAULT_GRPC_BIND_ADDRESS);
        assert_eq!(config.metrics_bind_address, DEFAULT_METRICS_BIND_ADDRESS);
    }

    #[test]
    fn debug_redacts_database_url() {
        let config = Config::from_vars(&vars(&[("DATABASE_URL", "postgres://user:pw@host/db")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("user:pw"));
    }
}
