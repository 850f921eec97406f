//! Prediction bundle adapter.

use super::encoder::{FeatureEncoder, SupervisedMetadata};
use super::forest::Forest;
use super::{bundle_error, open_bundle};
use crate::features::{FeatureView, Target};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use yts_bundle::{BundleKind, BundleManifest, BundleWriter};
use yts_common::{Error, Result};

pub const ARTIFACT_NAME: &str = "supervised_bundle";

const METADATA_FILE: &str = "metadata.json";
const METRICS_FILE: &str = "metrics.json";

fn model_file(target: Target) -> String {
    format!("models/{}.json", target)
}

/// Hold-out evaluation metrics for one target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Predicted values for the three targets, in original units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prediction {
    pub predicted_subscribers: f64,
    pub predicted_earnings: f64,
    pub predicted_growth: f64,
}

impl Prediction {
    pub fn get(&self, target: Target) -> f64 {
        match target {
            Target::Subscribers => self.predicted_subscribers,
            Target::Earnings => self.predicted_earnings,
            Target::Growth => self.predicted_growth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Three target regressors sharing one encoder.
#[derive(Debug, Clone)]
pub struct PredictionBundle {
    metadata: SupervisedMetadata,
    encoder: FeatureEncoder,
    models: BTreeMap<Target, Forest>,
    metrics: BTreeMap<Target, TargetMetrics>,
    /// Per target, sorted by descending importance (stable).
    importances: BTreeMap<Target, Vec<FeatureImportance>>,
}

impl PredictionBundle {
    /// Assemble and validate a bundle. All three targets must be present.
    pub fn from_parts(
        metadata: SupervisedMetadata,
        models: BTreeMap<Target, Forest>,
        metrics: BTreeMap<Target, TargetMetrics>,
    ) -> Result<Self> {
        let encoder = FeatureEncoder::from_metadata(&metadata)?;
        let corrupted = |reason: String| Error::ArtifactCorrupted {
            artifact: ARTIFACT_NAME.to_string(),
            reason,
        };

        let mut importances = BTreeMap::new();
        for target in Target::ALL {
            let forest = models
                .get(&target)
                .ok_or_else(|| corrupted(format!("no model for target '{}'", target)))?;
            forest
                .validate(encoder.width())
                .map_err(|e| corrupted(format!("{} model: {}", target, e)))?;
            if !metrics.contains_key(&target) {
                return Err(corrupted(format!("no metrics for target '{}'", target)));
            }

            let mut records: Vec<FeatureImportance> = encoder
                .feature_names()
                .iter()
                .zip(forest.feature_importances())
                .map(|(name, importance)| FeatureImportance {
                    feature: name.clone(),
                    importance,
                })
                .collect();
            // sort_by is stable: equal importances keep encoder order
            records.sort_by(|a, b| b.importance.total_cmp(&a.importance));
            importances.insert(target, records);
        }

        Ok(Self {
            metadata,
            encoder,
            models,
            metrics,
            importances,
        })
    }

    /// Load and verify a bundle file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = open_bundle(path, ARTIFACT_NAME, BundleKind::Supervised)?;
        let metadata: SupervisedMetadata = reader
            .read_json(METADATA_FILE)
            .map_err(|e| bundle_error(ARTIFACT_NAME, e))?;
        let metrics: BTreeMap<Target, TargetMetrics> = reader
            .read_json(METRICS_FILE)
            .map_err(|e| bundle_error(ARTIFACT_NAME, e))?;

        let mut models = BTreeMap::new();
        for target in Target::ALL {
            let forest: Forest = reader
                .read_json(&model_file(target))
                .map_err(|e| bundle_error(ARTIFACT_NAME, e))?;
            models.insert(target, forest);
        }

        let bundle = Self::from_parts(metadata, models, metrics)?;
        info!(
            path = %path.display(),
            run_id = reader.manifest().run_id.as_deref().unwrap_or("-"),
            features = bundle.encoder.width(),
            "Prediction bundle loaded"
        );
        Ok(bundle)
    }

    /// Write the bundle as a verified archive.
    pub fn write(&self, path: &Path, run_id: Option<&str>) -> Result<BundleManifest> {
        let mut writer = BundleWriter::new(BundleKind::Supervised)
            .with_producer("yts-core", env!("CARGO_PKG_VERSION"));
        if let Some(run_id) = run_id {
            writer = writer.with_run_id(run_id);
        }
        let to_err = |e| bundle_error(ARTIFACT_NAME, e);
        writer.add_json(METADATA_FILE, &self.metadata).map_err(to_err)?;
        writer.add_json(METRICS_FILE, &self.metrics).map_err(to_err)?;
        for (target, forest) in &self.models {
            writer.add_json(model_file(*target), forest).map_err(to_err)?;
        }
        writer.write(path).map_err(to_err)
    }

    pub fn metadata(&self) -> &SupervisedMetadata {
        &self.metadata
    }

    pub fn metrics(&self) -> &BTreeMap<Target, TargetMetrics> {
        &self.metrics
    }

    /// Expanded feature names, in encoder order.
    pub fn feature_names(&self) -> &[String] {
        self.encoder.feature_names()
    }

    fn predict_target(&self, target: Target, x: &[f64]) -> f64 {
        let raw = self.models.get(&target).map(|f| f.predict(x)).unwrap_or(0.0);
        yts_math::to_target_space(raw)
    }

    /// Predict all three targets for one row.
    pub fn predict(&self, row: &impl FeatureView) -> Prediction {
        let x = self.encoder.encode(row);
        Prediction {
            predicted_subscribers: self.predict_target(Target::Subscribers, &x),
            predicted_earnings: self.predict_target(Target::Earnings, &x),
            predicted_growth: self.predict_target(Target::Growth, &x),
        }
    }

    /// Predict each row independently, preserving input order.
    pub fn predict_batch<R: FeatureView>(&self, rows: &[R]) -> Vec<Prediction> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// The `top_n` most important expanded features for `target`.
    ///
    /// `top_n` is clamped to `[1, number of features]`.
    pub fn feature_importance(&self, target: Target, top_n: usize) -> Vec<FeatureImportance> {
        let records = match self.importances.get(&target) {
            Some(records) => records,
            None => return Vec::new(),
        };
        let n = top_n.max(1).min(records.len());
        records[..n].to_vec()
    }
}
