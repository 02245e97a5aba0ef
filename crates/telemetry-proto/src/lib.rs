//! Generated Protocol Buffer code for the telemetry pipeline's gRPC surface.
//!
//! This crate contains the compiled Protocol Buffer definitions used for
//! communication between pipeline services: the Gateway's ingress RPC, the
//! Registry's device/patient/threshold lookups, and the Scorer's anomaly
//! detection RPC.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

// Re-export prost traits for convenience
pub use prost::Message;

pub mod gateway {
    //! Gateway ingress RPC (`TelemetryGateway.SendMeasurements`)
    include!("generated/telemetry.gateway.rs");
}

pub mod registry {
    //! Registry lookups (device, patient, threshold profile)
    include!("generated/telemetry.registry.rs");
}

pub mod scorer {
    //! Anomaly detection RPC
    include!("generated/telemetry.scorer.rs");
}
