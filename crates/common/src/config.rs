//! Shared configuration value objects and env-var parsing helpers.
//!
//! Each service defines its own `Config` struct with a `from_env` /
//! `from_vars(&HashMap<..>)` pair (see `registry-service::config` for the
//! canonical example) and composes these shared pieces for broker, database,
//! cache, and RPC-peer settings instead of redefining them per service.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable was set but could not be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Name of the offending environment variable.
        name: String,
        /// Human-readable parse failure reason.
        reason: String,
    },
}

/// Read a required environment variable out of a var map.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVar`] if `name` is absent.
pub fn require(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Read an optional environment variable, falling back to `default`.
#[must_use]
pub fn optional(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name).cloned().unwrap_or_else(|| default.to_string())
}

/// Read and parse an optional numeric/boolean environment variable.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the variable is set but fails to parse.
pub fn parse_optional<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Kafka-compatible broker connection settings shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Comma-separated `host:port` broker list.
    pub bootstrap_servers: String,
    /// `client.id` reported to the broker.
    pub client_id: String,
    /// Stable consumer-group identity for this stage.
    pub consumer_group: String,
}

/// PostgreSQL connection settings (Registry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub postgres_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

/// Redis connection settings (Scorer cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Whether the cache is enabled; when false the scorer always uses the
    /// in-process fallback (spec §4.5 storage model).
    pub enabled: bool,
}

/// Settings for an outbound RPC peer (Registry or Scorer client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcClientConfig {
    /// Peer base URL, e.g. `http://registry:9090`.
    pub endpoint: String,
    /// Per-call deadline in milliseconds.
    pub timeout_ms: u64,
    /// Number of retry attempts after the first try.
    pub retry_count: u32,
    /// Base retry delay in milliseconds (linear backoff: `delay * attempt`).
    pub retry_delay_ms: u64,
}

/// Graceful-shutdown and logging settings common to every binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Deadline for draining in-flight handlers on shutdown, in milliseconds.
    pub shutdown_deadline_ms: u64,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info"`.
    pub log_level: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn require_returns_value_when_present() {
        let vars = vars(&[("FOO", "bar")]);
        assert_eq!(require(&vars, "FOO").unwrap(), "bar");
    }

    #[test]
    fn require_errors_when_missing() {
        let vars = vars(&[]);
        assert!(matches!(
            require(&vars, "FOO"),
            Err(ConfigError::MissingEnvVar(name)) if name == "FOO"
        ));
    }

    #[test]
    fn optional_falls_back_to_default() {
        let vars = vars(&[]);
        assert_eq!(optional(&vars, "FOO", "default"), "default");
    }

    #[test]
    fn parse_optional_parses_present_value() {
        let vars = vars(&[("N", "42")]);
        let n: u32 = parse_optional(&vars, "N", 0).unwrap();
        assert_eq!(n, 42);
    }

    #[test]
    fn parse_optional_rejects_invalid_value() {
        let vars = vars(&[("N", "not-a-number")]);
        let result: Result<u32, _> = parse_optional(&vars, "N", 0);
        assert!(matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "N"));
    }

    #[test]
    fn parse_optional_uses_default_when_absent() {
        let vars = vars(&[]);
        let n: u32 = parse_optional(&vars, "N", 7).unwrap();
        assert_eq!(n, 7);
    }
}
