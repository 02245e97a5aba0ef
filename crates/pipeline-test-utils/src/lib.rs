//! # Pipeline Test Utilities
//!
//! Shared test utilities for the telemetry pipeline services.
//!
//! This crate provides:
//! - Fixture builders for every event body (`RawTelemetry`, `NormalizedTelemetry`,
//!   `EnrichedTelemetry`, `ScoredTelemetry`, `Alert`)
//! - In-process mock Registry and Anomaly Scorer gRPC servers for testing
//!   the Enricher and Rules Engine without real infrastructure
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pipeline_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let server = TestRegistryServer::spawn(MockRegistry::builder().known_device("dev-1", "pat-1").build()).await;
//!     let client = enricher_service::registry_client::RegistryClient::connect(&server.endpoint(), 1_000).unwrap();
//!     // ...
//! }
//! ```

pub mod fixtures;
pub mod mock_registry;
pub mod mock_scorer;

pub use fixtures::*;
pub use mock_registry::*;
pub use mock_scorer::*;
