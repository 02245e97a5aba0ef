//! Rules Engine: anomaly scoring, fixed rule evaluation, and dual
//! `scored`/`alerts` publication (spec §4.4).

pub mod alert;
pub mod config;
pub mod metrics;
pub mod rules;
pub mod scorer_client;
