//! Point-in-time feature snapshot export.

use crate::features::ChannelRecord;
use crate::fsutil::write_jsonl_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use yts_common::id::format_utc_seconds;
use yts_common::{ChannelId, Result};

/// One snapshot row. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub channel_id: ChannelId,
    pub uploads: Option<f64>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub age: Option<f64>,
    pub subscribers: Option<f64>,
    pub highest_yearly_earnings: Option<f64>,
    pub growth_target: Option<f64>,
    pub event_timestamp: String,
}

/// Every row of one snapshot shares the same event timestamp.
pub fn build_snapshot(rows: &[ChannelRecord], at: DateTime<Utc>) -> Vec<SnapshotRow> {
    let event_timestamp = format_utc_seconds(at);
    rows.iter()
        .enumerate()
        .map(|(i, r)| SnapshotRow {
            channel_id: ChannelId::from_index(i),
            uploads: r.uploads,
            category: r.category.clone(),
            country: r.country.clone(),
            age: r.age,
            subscribers: r.subscribers,
            highest_yearly_earnings: r.highest_yearly_earnings,
            growth_target: r.growth_target,
            event_timestamp: event_timestamp.clone(),
        })
        .collect()
}

pub fn save_snapshot(rows: &[ChannelRecord], path: &Path) -> Result<usize> {
    let snapshot = build_snapshot(rows, Utc::now());
    write_jsonl_atomic(path, &snapshot)?;
    Ok(snapshot.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_ids_and_shared_timestamp() {
        let rows = vec![ChannelRecord::default(), ChannelRecord::default()];
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let snapshot = build_snapshot(&rows, at);
        assert_eq!(snapshot[1].channel_id.0, "channel-1");
        assert!(snapshot
            .iter()
            .all(|r| r.event_timestamp == "2026-05-01T12:00:00+00:00"));
    }

    #[test]
    fn test_snapshot_column_order() {
        let rows = vec![ChannelRecord {
            uploads: Some(3.0),
            ..Default::default()
        }];
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let line = serde_json::to_string(&build_snapshot(&rows, at)[0]).unwrap();
        let channel = line.find("channel_id").unwrap();
        let uploads = line.find("uploads").unwrap();
        let ts = line.find("event_timestamp").unwrap();
        assert!(channel < uploads && uploads < ts);
    }
}
