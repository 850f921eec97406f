//! Processed channel table loading.
//!
//! The external data pipeline exports the cleaned training table as JSON
//! Lines, one [`ChannelRecord`] per line.

use crate::features::ChannelRecord;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;
use yts_common::{Error, Result};

/// Load every record from a JSONL file. Blank lines are skipped.
pub fn load_jsonl(path: &Path) -> Result<Vec<ChannelRecord>> {
    let file = std::fs::File::open(path).map_err(|e| Error::Dataset {
        path: path.to_path_buf(),
        line: 0,
        message: e.to_string(),
    })?;
    let records = parse_jsonl(BufReader::new(file), path)?;
    debug!(path = %path.display(), rows = records.len(), "Dataset loaded");
    Ok(records)
}

/// Parse JSONL from any reader; `path` is used for error reporting only.
pub fn parse_jsonl<R: BufRead>(reader: R, path: &Path) -> Result<Vec<ChannelRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::Dataset {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| Error::Dataset {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}
