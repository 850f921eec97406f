//! Column encoder fitted at training time.
//!
//! Numeric columns pass through (missing values take the training median);
//! categorical columns are one-hot encoded over the sorted training
//! vocabulary. Values outside the vocabulary encode as all zeros.

use crate::features::{FeatureView, CATEGORICAL_FEATURES, FEATURE_COLUMNS, NUMERIC_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yts_common::{Error, Result};

/// Target transform the regressors were trained under.
pub const TARGET_TRANSFORM_LOG1P: &str = "log1p";

fn default_transform() -> String {
    TARGET_TRANSFORM_LOG1P.to_string()
}

/// `metadata.json` of a supervised bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisedMetadata {
    /// Raw input columns, in model order.
    pub feature_columns: Vec<String>,
    /// Sorted distinct category values seen in training.
    pub categories: Vec<String>,
    /// Sorted distinct country values seen in training.
    pub countries: Vec<String>,
    /// Imputation value per numeric column.
    #[serde(default)]
    pub numeric_fill: BTreeMap<String, f64>,
    /// Imputation value per categorical column.
    #[serde(default)]
    pub categorical_fill: BTreeMap<String, String>,
    #[serde(default = "default_transform")]
    pub target_transform: String,
}

impl SupervisedMetadata {
    /// Metadata for the given vocabularies; inputs are sorted and deduplicated.
    pub fn new(categories: Vec<String>, countries: Vec<String>) -> Self {
        let normalize = |mut values: Vec<String>| {
            values.sort();
            values.dedup();
            values
        };
        Self {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categories: normalize(categories),
            countries: normalize(countries),
            numeric_fill: BTreeMap::new(),
            categorical_fill: BTreeMap::new(),
            target_transform: default_transform(),
        }
    }

    pub fn with_numeric_fill(mut self, column: &str, value: f64) -> Self {
        self.numeric_fill.insert(column.to_string(), value);
        self
    }

    pub fn with_categorical_fill(mut self, column: &str, value: impl Into<String>) -> Self {
        self.categorical_fill.insert(column.to_string(), value.into());
        self
    }

    fn vocabulary(&self, column: &str) -> &[String] {
        match column {
            "category" => &self.categories,
            "country" => &self.countries,
            _ => &[],
        }
    }
}

/// Encoder rebuilt from bundle metadata.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    numeric_fill: Vec<f64>,
    categorical_fill: Vec<Option<String>>,
    vocabularies: Vec<Vec<String>>,
    feature_names: Vec<String>,
}

impl FeatureEncoder {
    pub fn from_metadata(metadata: &SupervisedMetadata) -> Result<Self> {
        let corrupted = |reason: String| Error::ArtifactCorrupted {
            artifact: "supervised_bundle".to_string(),
            reason,
        };

        if metadata.feature_columns != FEATURE_COLUMNS {
            return Err(corrupted(format!(
                "feature columns {:?} do not match expected {:?}",
                metadata.feature_columns, FEATURE_COLUMNS
            )));
        }
        if metadata.target_transform != TARGET_TRANSFORM_LOG1P {
            return Err(corrupted(format!(
                "unsupported target transform '{}'",
                metadata.target_transform
            )));
        }

        let mut feature_names: Vec<String> = NUMERIC_FEATURES
            .iter()
            .map(|c| format!("numeric__{}", c))
            .collect();
        let mut vocabularies = Vec::with_capacity(CATEGORICAL_FEATURES.len());
        for column in CATEGORICAL_FEATURES {
            let vocab = metadata.vocabulary(column);
            if vocab.windows(2).any(|w| w[0] >= w[1]) {
                return Err(corrupted(format!(
                    "{} vocabulary is not sorted and distinct",
                    column
                )));
            }
            feature_names.extend(vocab.iter().map(|v| format!("categorical__{}_{}", column, v)));
            vocabularies.push(vocab.to_vec());
        }

        Ok(Self {
            numeric_fill: NUMERIC_FEATURES
                .iter()
                .map(|c| metadata.numeric_fill.get(*c).copied().unwrap_or(0.0))
                .collect(),
            categorical_fill: CATEGORICAL_FEATURES
                .iter()
                .map(|c| metadata.categorical_fill.get(*c).cloned())
                .collect(),
            vocabularies,
            feature_names,
        })
    }

    /// Names of the expanded columns, in encoded order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    /// Encode one row into the expanded feature space.
    pub fn encode(&self, row: &impl FeatureView) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        for (column, fill) in NUMERIC_FEATURES.iter().zip(&self.numeric_fill) {
            out.push(row.numeric(column).unwrap_or(*fill));
        }
        for ((column, fill), vocab) in CATEGORICAL_FEATURES
            .iter()
            .zip(&self.categorical_fill)
            .zip(&self.vocabularies)
        {
            let value = row.categorical(column).or_else(|| fill.clone());
            let hit = value.and_then(|v| vocab.binary_search(&v).ok());
            out.extend((0..vocab.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        }
        out
    }
}
