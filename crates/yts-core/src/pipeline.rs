//! Post-training registration run.
//!
//! The external trainer leaves two bundles in the model directory. A
//! registration run verifies them, derives every report from the processed
//! dataset, then publishes the manifest and updates the registry. Nothing is
//! written until both bundles have loaded and verified, and the registry is
//! only touched after the manifest has been written.

use crate::dataset;
use crate::features::{ChannelRecord, FeatureView, UNKNOWN_CATEGORY};
use crate::fsutil::write_json_pretty_atomic;
use crate::logging::{event_names, Stage};
use crate::mlops::drift::{build_baseline, save_baseline};
use crate::mlops::feature_store::save_snapshot;
use crate::mlops::quality::{build_quality_report, save_quality_report};
use crate::mlops::registry::{ArtifactRegistry, ModelRegistry, TrainingManifest, TrainingMetrics};
use crate::mlops::tracking::{ExperimentTracker, FanoutTracker};
use crate::models::{
    clustering, supervised, ClusterTrainingRow, ClusteringBundle, PredictionBundle,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span, warn};
use yts_common::{ArtifactPaths, Error, Result, RunId, TrackingConfig, TrainingConfig};

const RUN_NAME: &str = "register";

/// Inputs of one registration run.
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    pub training: TrainingConfig,
    pub tracking: TrackingConfig,
    /// Generated when unset.
    pub run_id: Option<RunId>,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub run_id: RunId,
    pub rows: usize,
    pub manifest: TrainingManifest,
    pub manifest_path: PathBuf,
    pub registry: ModelRegistry,
    /// Files written by this run, in write order.
    pub written: Vec<(&'static str, PathBuf)>,
}

/// Load both bundles, reporting every missing one together.
fn load_bundles(paths: &ArtifactPaths) -> Result<(PredictionBundle, ClusteringBundle)> {
    let missing: Vec<String> = [
        (supervised::ARTIFACT_NAME, paths.supervised_bundle()),
        (clustering::ARTIFACT_NAME, paths.clustering_bundle()),
    ]
    .iter()
    .filter(|(_, path)| !path.exists())
    .map(|(name, _)| name.to_string())
    .collect();
    if !missing.is_empty() {
        return Err(Error::ArtifactsUnavailable { missing });
    }
    Ok((
        PredictionBundle::load(&paths.supervised_bundle())?,
        ClusteringBundle::load(&paths.clustering_bundle())?,
    ))
}

/// Label every training row with its centroid and density clusters.
///
/// Missing numeric cells are read as zero and missing text as `Unknown`.
pub fn label_rows(bundle: &ClusteringBundle, rows: &[ChannelRecord]) -> Vec<ClusterTrainingRow> {
    rows.iter()
        .map(|row| {
            let num = |column: &str| row.numeric(column).unwrap_or(0.0);
            let text = |column: &str| {
                row.categorical(column)
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
            };
            let (uploads, subscribers, earnings, growth) = (
                num("uploads"),
                num("subscribers"),
                num("highest_yearly_earnings"),
                num("growth_target"),
            );
            ClusterTrainingRow {
                uploads,
                subscribers,
                earnings,
                growth,
                category: text("category"),
                country: text("country"),
                cluster: bundle.assign(uploads, subscribers, earnings, growth).cluster_id,
                density_cluster: bundle.assign_density(uploads, subscribers, earnings, growth),
            }
        })
        .collect()
}

fn run_params(
    options: &RegistrationOptions,
    paths: &ArtifactPaths,
    rows: usize,
) -> Result<BTreeMap<String, Value>> {
    let mut params = match serde_json::to_value(&options.training)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    params.insert(
        "data_path".to_string(),
        Value::String(paths.data_path.display().to_string()),
    );
    params.insert("rows".to_string(), Value::from(rows));
    Ok(params)
}

/// Run one registration against `paths`.
pub fn register_run(
    paths: &ArtifactPaths,
    options: &RegistrationOptions,
) -> Result<RegistrationOutcome> {
    let run_id = options.run_id.clone().unwrap_or_default();
    let span = info_span!("register", run_id = %run_id);
    let _guard = span.enter();
    let started = Instant::now();

    info!(
        event = event_names::PIPELINE_STARTED,
        stage = %Stage::Pipeline,
        data_path = %paths.data_path.display(),
        "Registration started"
    );

    let (supervised, clustering) = load_bundles(paths)?;
    let rows = dataset::load_jsonl(&paths.data_path)?;
    if rows.is_empty() {
        return Err(Error::Dataset {
            path: paths.data_path.clone(),
            line: 0,
            message: "dataset has no rows".to_string(),
        });
    }

    let mut tracker =
        FanoutTracker::boxed(&options.tracking, RUN_NAME, run_id.as_str(), &paths.tracking_dir())?;
    let result = publish(
        paths,
        options,
        &run_id,
        &rows,
        &supervised,
        &clustering,
        tracker.as_mut(),
    );
    let ended = tracker.end();

    let outcome = result?;
    ended?;
    info!(
        event = event_names::PIPELINE_FINISHED,
        stage = %Stage::Pipeline,
        rows = outcome.rows,
        artifacts = outcome.written.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Registration finished"
    );
    Ok(outcome)
}

fn publish(
    paths: &ArtifactPaths,
    options: &RegistrationOptions,
    run_id: &RunId,
    rows: &[ChannelRecord],
    supervised: &PredictionBundle,
    clustering: &ClusteringBundle,
    tracker: &mut dyn ExperimentTracker,
) -> Result<RegistrationOutcome> {
    tracker.log_params(&run_params(options, paths, rows.len())?)?;

    let mut written: Vec<(&'static str, PathBuf)> = Vec::new();
    let mut record = |name: &'static str, path: PathBuf| {
        info!(
            event = event_names::PIPELINE_ARTIFACT_WRITTEN,
            stage = %Stage::Pipeline,
            artifact = name,
            path = %path.display(),
            "Artifact written"
        );
        written.push((name, path));
    };

    let quality_path = paths.data_quality_report();
    save_quality_report(&build_quality_report(rows), &quality_path)?;
    record("data_quality_report", quality_path);

    let baseline_path = paths.training_baseline();
    save_baseline(&build_baseline(rows), &baseline_path)?;
    record("training_baseline", baseline_path);

    let snapshot_path = paths.feature_store_snapshot();
    save_snapshot(rows, &snapshot_path)?;
    record("feature_store_snapshot", snapshot_path);

    let clustered_path = paths.clustered_channels();
    clustering.write_clustered_channels(&clustered_path, &label_rows(clustering, rows))?;
    record("clustered_channels", clustered_path);

    let metrics = TrainingMetrics {
        supervised_metrics: supervised.metrics().clone(),
        clusters: clustering.profiles().to_vec(),
    };
    let metrics_path = paths.training_metrics();
    write_json_pretty_atomic(&metrics_path, &metrics)?;
    record("training_metrics", metrics_path);

    let registry = ArtifactRegistry::new(paths.clone());
    let manifest = registry.build_manifest(run_id, &options.training, &metrics, &paths.data_path)?;
    let manifest_path = registry.write_manifest(&manifest)?;
    record("training_manifest", manifest_path.clone());

    let model_registry = registry.update_registry(&manifest)?;
    record("model_registry", paths.model_registry());

    tracker.log_metrics(&metrics.flatten(), None)?;
    for (_, path) in &written {
        if let Err(e) = tracker.log_artifact(path) {
            warn!(path = %path.display(), error = %e, "Artifact not tracked");
        }
    }

    Ok(RegistrationOutcome {
        run_id: run_id.clone(),
        rows: rows.len(),
        manifest,
        manifest_path,
        registry: model_registry,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_bundles_abort_before_writing() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::from_root(dir.path());
        let err = register_run(&paths, &RegistrationOptions::default()).unwrap_err();
        match err {
            Error::ArtifactsUnavailable { missing } => {
                assert_eq!(missing, vec!["supervised_bundle", "clustering_bundle"]);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert!(!paths.report_dir.exists());
        assert!(!paths.mlops_dir.exists());
    }

    #[test]
    fn test_run_params_include_config_and_rows() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::from_root(dir.path());
        let params = run_params(&RegistrationOptions::default(), &paths, 7).unwrap();
        assert_eq!(params["n_clusters"], 4);
        assert_eq!(params["rows"], 7);
        assert!(params.contains_key("data_path"));
    }
}
