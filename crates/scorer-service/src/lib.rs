//! Anomaly Scorer (C2): per-patient rolling baselines, z-score anomaly
//! scoring over gRPC (spec §4.5).

pub mod baseline;
pub mod config;
pub mod error;
pub mod grpc;
pub mod lua;
pub mod metrics;
pub mod scoring;
pub mod store;
