//! Shared utilities and types used across the telemetry pipeline services.

#![warn(clippy::pedantic)]

/// Common error taxonomy (transient / validation / policy / fatal).
pub mod error;

/// Small shared identifier and timestamp helpers.
pub mod types;

/// Shared configuration value objects (database, redis, observability).
pub mod config;

/// Secret types that prevent accidental logging of sensitive values.
pub mod secret;

/// Retry/backoff helpers shared by producers and RPC clients.
pub mod retry;

/// Tracing/metrics bootstrap shared by every service binary.
pub mod observability;
