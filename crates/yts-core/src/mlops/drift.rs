//! Drift baseline engine.
//!
//! The baseline captures the training-time distribution of every model input
//! column. Scoring compares request items against it: numeric columns by
//! z-score, categorical columns by training frequency.

use crate::features::{
    FeatureView, CATEGORICAL_FEATURES, FEATURE_COLUMNS, NUMERIC_FEATURES, UNKNOWN_CATEGORY,
};
use crate::fsutil::{read_json_optional, write_json_pretty_atomic};
use crate::logging::event_names;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use yts_common::{Error, Result};

pub const ARTIFACT_NAME: &str = "training_baseline";

/// Floor applied to the baseline standard deviation of constant columns.
pub const MIN_STD: f64 = 1e-9;

/// Decimal places kept for categorical frequencies.
const FREQUENCY_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NumericBaseline {
    pub mean: f64,
    pub std: f64,
    pub p95: f64,
}

impl Default for NumericBaseline {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: 1.0,
            p95: 0.0,
        }
    }
}

/// Training-time feature distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DriftBaseline {
    pub features: Vec<String>,
    pub numeric: BTreeMap<String, NumericBaseline>,
    /// Column -> value -> share of training rows.
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Build the baseline from the processed training rows.
///
/// Missing numeric cells count as 0; missing categorical cells count as
/// `Unknown`. A standard deviation at or below [`MIN_STD`], or undefined
/// because there are fewer than two rows, is replaced by 1.0.
pub fn build_baseline<R: FeatureView>(rows: &[R]) -> DriftBaseline {
    let mut numeric = BTreeMap::new();
    for column in NUMERIC_FEATURES {
        let values: Vec<f64> = rows
            .iter()
            .map(|r| r.numeric(column).unwrap_or(0.0))
            .collect();
        let std = yts_math::sample_std(&values);
        numeric.insert(
            column.to_string(),
            NumericBaseline {
                mean: finite_or(yts_math::mean(&values), 0.0),
                std: if std.is_finite() && std > MIN_STD { std } else { 1.0 },
                p95: finite_or(yts_math::quantile(&values, 0.95), 0.0),
            },
        );
    }

    let mut categorical = BTreeMap::new();
    for column in CATEGORICAL_FEATURES {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            let value = row
                .categorical(column)
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
            *counts.entry(value).or_default() += 1;
        }
        let total = rows.len() as f64;
        let freqs = counts
            .into_iter()
            .map(|(value, n)| (value, yts_math::round_to(n as f64 / total, FREQUENCY_DECIMALS)))
            .collect();
        categorical.insert(column.to_string(), freqs);
    }

    DriftBaseline {
        features: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        numeric,
        categorical,
    }
}

pub fn save_baseline(baseline: &DriftBaseline, path: &Path) -> Result<()> {
    write_json_pretty_atomic(path, baseline)?;
    info!(
        event = event_names::BASELINE_WRITTEN,
        path = %path.display(),
        "Drift baseline written"
    );
    Ok(())
}

/// Load the persisted baseline; `None` when the file does not exist.
///
/// A file that cannot be parsed is [`Error::ArtifactCorrupted`].
pub fn load_baseline(path: &Path) -> Result<Option<DriftBaseline>> {
    read_json_optional(path).map_err(|e| match e {
        Error::Json(source) => Error::ArtifactCorrupted {
            artifact: ARTIFACT_NAME.to_string(),
            reason: format!("{}: {}", path.display(), source),
        },
        other => other,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    fn from_warning_count(n: usize) -> Self {
        match n {
            0 => Severity::Low,
            1 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DriftRecord {
    /// Position of the item in the request.
    pub index: usize,
    pub warnings: Vec<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DriftSummary {
    pub total_records: usize,
    pub high_severity_records: usize,
    pub is_drift_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DriftReport {
    pub summary: DriftSummary,
    pub records: Vec<DriftRecord>,
}

fn item_warnings(
    item: &impl FeatureView,
    baseline: &DriftBaseline,
    z_threshold: f64,
    min_category_frequency: f64,
) -> Vec<String> {
    let mut warnings = Vec::new();

    for column in NUMERIC_FEATURES {
        let stats = baseline.numeric.get(column).copied().unwrap_or_default();
        let value = item.numeric(column).unwrap_or(0.0);
        let z = ((value - stats.mean) / stats.std.max(MIN_STD)).abs();
        if z > z_threshold {
            warnings.push(format!("{}: high z-score {:.2}", column, z));
        }
    }

    for column in CATEGORICAL_FEATURES {
        let value = item
            .categorical(column)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        let frequency = baseline
            .categorical
            .get(column)
            .and_then(|table| table.get(&value))
            .copied()
            .unwrap_or(0.0);
        if frequency < min_category_frequency {
            warnings.push(format!(
                "{}: low-frequency category '{}' ({:.4})",
                column, value, frequency
            ));
        }
    }

    warnings
}

/// Score items against the baseline. Records keep input order.
pub fn score<R: FeatureView>(
    items: &[R],
    baseline: &DriftBaseline,
    z_threshold: f64,
    min_category_frequency: f64,
) -> DriftReport {
    let records: Vec<DriftRecord> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let warnings = item_warnings(item, baseline, z_threshold, min_category_frequency);
            let severity = Severity::from_warning_count(warnings.len());
            if !warnings.is_empty() {
                debug!(index, ?severity, warnings = warnings.len(), "Drift warnings");
            }
            DriftRecord {
                index,
                warnings,
                severity,
            }
        })
        .collect();

    let high = records
        .iter()
        .filter(|r| r.severity == Severity::High)
        .count();
    info!(
        event = event_names::DRIFT_SCORED,
        records = records.len(),
        high_severity = high,
        z_threshold,
        min_category_frequency,
        "Drift check scored"
    );

    DriftReport {
        summary: DriftSummary {
            total_records: records.len(),
            high_severity_records: high,
            is_drift_risk: high > 0,
        },
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ChannelRecord;
    use tempfile::TempDir;

    fn record(uploads: f64, category: &str, country: &str, age: f64) -> ChannelRecord {
        ChannelRecord {
            uploads: Some(uploads),
            category: Some(category.into()),
            country: Some(country.into()),
            age: Some(age),
            ..Default::default()
        }
    }

    fn training_rows() -> Vec<ChannelRecord> {
        vec![
            record(100.0, "Music", "US", 5.0),
            record(200.0, "Music", "US", 7.0),
            record(300.0, "Gaming", "IN", 9.0),
            ChannelRecord {
                uploads: Some(400.0),
                age: Some(11.0),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_baseline_stats() {
        let baseline = build_baseline(&training_rows());
        let uploads = baseline.numeric["uploads"];
        assert_eq!(uploads.mean, 250.0);
        assert!((uploads.std - 129.09944487358055).abs() < 1e-9);
        assert!((uploads.p95 - 385.0).abs() < 1e-9);

        let category = &baseline.categorical["category"];
        assert_eq!(category["Music"], 0.5);
        assert_eq!(category[UNKNOWN_CATEGORY], 0.25);
        let total: f64 = category.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(baseline.features, FEATURE_COLUMNS.to_vec());
    }

    #[test]
    fn test_constant_column_std_floored() {
        let rows = vec![record(5.0, "A", "B", 3.0), record(5.0, "A", "B", 3.0)];
        let baseline = build_baseline(&rows);
        assert_eq!(baseline.numeric["uploads"].std, 1.0);

        let single = build_baseline(&rows[..1]);
        assert_eq!(single.numeric["age"].std, 1.0);
    }

    #[test]
    fn test_item_at_mean_has_no_numeric_warning() {
        let baseline = build_baseline(&training_rows());
        let item = record(250.0, "Music", "US", 8.0);
        let report = score(&[item], &baseline, 0.1, 0.01);
        assert!(report.records[0].warnings.is_empty());
        assert_eq!(report.records[0].severity, Severity::Low);
    }

    #[test]
    fn test_unseen_category_always_flagged() {
        let baseline = build_baseline(&training_rows());
        let item = record(250.0, "Cooking", "US", 8.0);
        let report = score(&[item], &baseline, 3.0, 1e-6);
        assert_eq!(report.records[0].severity, Severity::Medium);
        assert!(report.records[0].warnings[0].starts_with("category: low-frequency"));
    }

    #[test]
    fn test_severity_and_summary() {
        let baseline = build_baseline(&training_rows());
        let items = vec![
            record(250.0, "Music", "US", 8.0),
            record(1.0e7, "Cooking", "US", 8.0),
            record(250.0, "Cooking", "FR", 8.0),
        ];
        let report = score(&items, &baseline, 3.0, 0.01);
        let severities: Vec<_> = report.records.iter().map(|r| r.severity).collect();
        assert_eq!(severities, vec![Severity::Low, Severity::High, Severity::High]);
        assert_eq!(report.records[2].index, 2);
        assert_eq!(report.summary.total_records, 3);
        assert_eq!(report.summary.high_severity_records, 2);
        assert!(report.summary.is_drift_risk);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("training_baseline.json");
        assert!(load_baseline(&path).unwrap().is_none());

        let baseline = build_baseline(&training_rows());
        save_baseline(&baseline, &path).unwrap();
        assert_eq!(load_baseline(&path).unwrap(), Some(baseline));
    }
}
