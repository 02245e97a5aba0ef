//! Small identifier and timestamp helpers shared across the pipeline.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique identifier for a single emitted pipeline event.
///
/// Generated fresh by every producing stage; never reused across events
/// even when the payload is logically a duplicate (spec §3 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a new random event id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lineage-correlation identifier, minted once at the Gateway and copied
/// byte-for-byte by every downstream stage (spec §3 invariants, P1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub Uuid);

impl TraceId {
    /// Generate a new random trace id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a UTC instant as ISO-8601 with millisecond precision, the wire
/// format used for every `timestamp` field in the pipeline (spec §3).
#[must_use]
pub fn to_iso8601_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a timestamp accepted from an upstream producer: ISO-8601, Unix
/// seconds, or Unix milliseconds (spec §4.2 step 4).
///
/// Returns `None` if none of the accepted formats match, in which case the
/// caller should substitute "now" and flag `validation_status`.
#[must_use]
pub fn parse_flexible_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(n) = raw.parse::<i64>() {
        // Heuristic: values above this threshold are plausibly milliseconds
        // (Unix seconds for "now" is ~1.7e9; milliseconds is ~1.7e12).
        const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;
        return if n.abs() >= MILLIS_THRESHOLD {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
    }

    if let Ok(f) = raw.parse::<f64>() {
        // Fractional unix seconds, e.g. "1700000000.500".
        let secs = f.trunc() as i64;
        let millis = ((f.fract()) * 1000.0).round() as u32;
        return Utc
            .timestamp_opt(secs, millis.saturating_mul(1_000_000))
            .single();
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn event_id_and_trace_id_are_distinct() {
        let e = EventId::new();
        let t = TraceId::new();
        assert_ne!(e.to_string(), "");
        assert_ne!(t.to_string(), "");
    }

    #[test]
    fn parses_iso8601() {
        let parsed = parse_flexible_timestamp("2024-01-15T10:30:00.000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn parses_unix_seconds() {
        let parsed = parse_flexible_timestamp("1700000000").unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parses_unix_millis() {
        let parsed = parse_flexible_timestamp("1700000000000").unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible_timestamp("not-a-timestamp").is_none());
    }

    #[test]
    fn round_trip_to_iso8601_millis() {
        let now = Utc.timestamp_opt(1_700_000_000, 123_000_000).single().unwrap();
        let rendered = to_iso8601_millis(now);
        assert!(rendered.ends_with("123Z") || rendered.ends_with("123+00:00"));
    }
}
