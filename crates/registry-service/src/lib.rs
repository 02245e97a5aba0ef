//! Registry (C1): read-only device/patient/threshold lookups served over
//! gRPC, backed by Postgres (spec §4.6).

pub mod config;
pub mod error;
pub mod grpc;
pub mod metrics;
pub mod repository;
