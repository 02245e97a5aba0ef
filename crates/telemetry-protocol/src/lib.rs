//! Shared event envelope, domain model, and Kafka plumbing for the
//! telemetry-processing pipeline.
//!
//! Every pipeline stage (Gateway, Normalizer, Enricher, Rules Engine) depends
//! on this crate for its event types and for the producer/consumer/shutdown
//! primitives described in spec §4.7 and §5.

#![warn(clippy::pedantic)]

/// The fixed envelope embedded in every pipeline event, plus the five
/// stage-specific event bodies.
pub mod envelope;

/// Canonical measurement types, metric aliasing, and clamp windows.
pub mod measurement;

/// Severity ordering shared by the Rules Engine and the Anomaly Scorer.
pub mod severity;

/// Bounded event-id dedupe set for the scorer's optional dedupe-by-`event_id`
/// policy (spec §9 Open Questions).
pub mod dedupe;

/// Kafka producer/consumer wrappers (idempotent producer, bounded-concurrency
/// consumer loop with commit-after-publish semantics).
pub mod broker;

/// Graceful shutdown primitives shared by every consumer-loop binary.
pub mod shutdown;
