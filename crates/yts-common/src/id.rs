//! Run and channel identity types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Training run identifier.
///
/// Format: `YYYYMMDDTHHMMSSZ-xxxxxxxx` (UTC second, then 8 lowercase hex
/// characters from a random UUID). Lexicographic order follows creation time
/// at second granularity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run ID for the current instant.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Generate a run ID stamped with the given instant.
    pub fn at(ts: DateTime<Utc>) -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("{}Z-{}", ts.format("%Y%m%dT%H%M%S"), &uuid[..8]))
    }

    /// Parse and validate an existing run ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 25 {
            return None;
        }
        let bytes = s.as_bytes();
        if bytes.get(8) != Some(&b'T') || bytes.get(15) != Some(&b'Z') || bytes.get(16) != Some(&b'-')
        {
            return None;
        }
        let date = &s[0..8];
        let time = &s[9..15];
        let suffix = &s[17..25];
        if !date.chars().all(|c| c.is_ascii_digit()) || !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return None;
        }
        Some(RunId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synthetic channel identifier used by the feature-store snapshot.
///
/// Format: `channel-<row index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn from_index(index: usize) -> Self {
        ChannelId(format!("channel-{}", index))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC timestamp truncated to whole seconds, RFC 3339 with `+00:00` offset.
pub fn utc_now_iso() -> String {
    format_utc_seconds(Utc::now())
}

/// Format an instant the way manifests and snapshots record it.
pub fn format_utc_seconds(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_id_format() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let id = RunId::at(ts);
        assert!(id.0.starts_with("20260304T050607Z-"));
        assert_eq!(id.0.len(), 25);
        assert!(RunId::parse(&id.0).is_some());
    }

    #[test]
    fn test_run_id_unique() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_run_id_parse_rejects_garbage() {
        assert!(RunId::parse("").is_none());
        assert!(RunId::parse("20260304T050607Z-ABCDEF12").is_none());
        assert!(RunId::parse("20260304-050607Z-abcdef12").is_none());
        assert!(RunId::parse("20260304T050607Z-abcdef1").is_none());
    }

    #[test]
    fn test_run_ids_order_by_time() {
        let early = RunId::at(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap());
        let late = RunId::at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert!(early < late);
    }

    #[test]
    fn test_channel_id() {
        assert_eq!(ChannelId::from_index(0).to_string(), "channel-0");
        assert_eq!(ChannelId::from_index(42).0, "channel-42");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        assert_eq!(format_utc_seconds(ts), "2026-10-19T08:30:00+00:00");
    }
}
