//! Data-quality report for the processed training table.

use crate::features::{ChannelRecord, FeatureView, RECORD_COLUMNS, RECORD_NUMERIC_COLUMNS};
use crate::fsutil::write_json_pretty_atomic;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use yts_common::Result;
use yts_math::{round_to, Summary};

const DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl From<Summary> for ColumnSummary {
    fn from(s: Summary) -> Self {
        Self {
            mean: s.mean,
            std: s.std,
            min: s.min,
            max: s.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableQuality {
    pub rows: usize,
    pub columns: usize,
    pub duplicates: usize,
    pub missing_percent: BTreeMap<String, f64>,
    pub numeric_summary: BTreeMap<String, ColumnSummary>,
    pub feature_cardinality: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataQualityReport {
    pub processed: TableQuality,
    pub transformations: BTreeMap<String, String>,
}

/// Rows equal to an earlier row. Numbers compare by bit pattern.
fn count_duplicates(rows: &[ChannelRecord]) -> usize {
    let key = |r: &ChannelRecord| {
        let num = |v: Option<f64>| v.map(f64::to_bits);
        (
            num(r.uploads),
            r.category.clone(),
            r.country.clone(),
            num(r.age),
            num(r.subscribers),
            num(r.highest_yearly_earnings),
            num(r.growth_target),
        )
    };
    let mut seen = HashSet::new();
    rows.iter().filter(|r| !seen.insert(key(r))).count()
}

fn distinct(rows: &[ChannelRecord], column: &str) -> usize {
    rows.iter()
        .filter_map(|r| r.categorical(column))
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn build_quality_report(rows: &[ChannelRecord]) -> DataQualityReport {
    let n = rows.len();

    let missing_percent = RECORD_COLUMNS
        .iter()
        .map(|&column| {
            let missing = rows.iter().filter(|r| r.is_missing(column)).count();
            let pct = if n == 0 {
                0.0
            } else {
                round_to(missing as f64 * 100.0 / n as f64, DECIMALS)
            };
            (column.to_string(), pct)
        })
        .collect();

    let numeric_summary = RECORD_NUMERIC_COLUMNS
        .iter()
        .map(|&column| {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.numeric(column)).collect();
            let summary = Summary::of(&values).rounded(DECIMALS);
            (column.to_string(), ColumnSummary::from(summary))
        })
        .collect();

    let feature_cardinality = ["category", "country"]
        .iter()
        .map(|&column| (column.to_string(), distinct(rows, column)))
        .collect();

    let transformations = [
        (
            "age_engineered",
            "age = current_year - created_year (clipped >= 0, median-imputed, integer)",
        ),
        (
            "growth_target",
            "growth_target = subscribers_for_last_30_days (null->0)",
        ),
        ("categorical_fill", "country/category filled with 'Unknown'"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    DataQualityReport {
        processed: TableQuality {
            rows: n,
            columns: RECORD_COLUMNS.len(),
            duplicates: count_duplicates(rows),
            missing_percent,
            numeric_summary,
            feature_cardinality,
        },
        transformations,
    }
}

pub fn save_quality_report(report: &DataQualityReport, path: &Path) -> Result<()> {
    write_json_pretty_atomic(path, report)
}
