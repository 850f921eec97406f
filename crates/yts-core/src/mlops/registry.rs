//! Artifact registry: readiness, training manifests and the run registry.
//!
//! A manifest is written in full before the registry is touched, so a crash
//! between the two leaves the previous registry state loadable.

use crate::fsutil::{read_json_optional, write_json_pretty_atomic};
use crate::logging::event_names;
use crate::models::{ClusterProfile, TargetMetrics};
use crate::features::Target;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use yts_common::hash::file_sha256;
use yts_common::id::format_utc_seconds;
use yts_common::{ArtifactPaths, Error, Result, RunId, TrainingConfig};

/// Artifact names, in readiness-report order.
pub const ARTIFACT_NAMES: [&str; 7] = [
    "supervised_bundle",
    "clustering_bundle",
    "clustered_channels",
    "training_metrics",
    "data_quality_report",
    "training_baseline",
    "training_manifest",
];

/// Result of the readiness probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadinessReport {
    pub ready: bool,
    pub missing: Vec<String>,
    pub artifacts: BTreeMap<String, String>,
}

/// Metrics produced by a training run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TrainingMetrics {
    pub supervised_metrics: BTreeMap<Target, TargetMetrics>,
    pub clusters: Vec<ClusterProfile>,
}

impl TrainingMetrics {
    /// Scalar metrics keyed `<target>_<metric>` for experiment trackers.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        for (target, m) in &self.supervised_metrics {
            flat.insert(format!("{}_mae", target), m.mae);
            flat.insert(format!("{}_rmse", target), m.rmse);
            flat.insert(format!("{}_r2", target), m.r2);
        }
        flat
    }
}

/// Provenance record for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingManifest {
    pub run_id: String,
    pub timestamp_utc: String,
    /// Version of the tool that registered the run.
    pub version: String,
    pub platform: String,
    pub data_path: String,
    pub data_sha256: String,
    pub training_config: TrainingConfig,
    pub metrics: TrainingMetrics,
    /// Hashes of artifacts that existed when the manifest was built.
    pub artifact_hashes: BTreeMap<String, String>,
    pub artifact_paths: BTreeMap<String, String>,
}

/// One run in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryEntry {
    pub run_id: String,
    pub timestamp_utc: String,
    pub artifact_paths: BTreeMap<String, String>,
    pub training_config: TrainingConfig,
}

impl From<&TrainingManifest> for RegistryEntry {
    fn from(manifest: &TrainingManifest) -> Self {
        Self {
            run_id: manifest.run_id.clone(),
            timestamp_utc: manifest.timestamp_utc.clone(),
            artifact_paths: manifest.artifact_paths.clone(),
            training_config: manifest.training_config.clone(),
        }
    }
}

/// Persisted run registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModelRegistry {
    pub active_run_id: Option<String>,
    #[serde(default)]
    pub runs: Vec<RegistryEntry>,
}

impl ModelRegistry {
    /// Replace any entry for the manifest's run, then re-sort by timestamp.
    pub fn record(&mut self, manifest: &TrainingManifest) {
        self.runs.retain(|r| r.run_id != manifest.run_id);
        self.runs.push(RegistryEntry::from(manifest));
        self.runs
            .sort_by(|a, b| a.timestamp_utc.cmp(&b.timestamp_utc));
        self.active_run_id = Some(manifest.run_id.clone());
    }
}

fn platform_descriptor() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Readiness, manifest and registry operations over one artifact layout.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    paths: ArtifactPaths,
}

impl ArtifactRegistry {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Expected location of every artifact, in [`ARTIFACT_NAMES`] order.
    pub fn expected_artifact_paths(&self) -> Vec<(&'static str, PathBuf)> {
        let p = &self.paths;
        vec![
            (ARTIFACT_NAMES[0], p.supervised_bundle()),
            (ARTIFACT_NAMES[1], p.clustering_bundle()),
            (ARTIFACT_NAMES[2], p.clustered_channels()),
            (ARTIFACT_NAMES[3], p.training_metrics()),
            (ARTIFACT_NAMES[4], p.data_quality_report()),
            (ARTIFACT_NAMES[5], p.training_baseline()),
            (ARTIFACT_NAMES[6], p.training_manifest()),
        ]
    }

    /// Existence check only; files are never opened.
    pub fn check_ready(&self) -> ReadinessReport {
        let mut missing = Vec::new();
        let mut artifacts = BTreeMap::new();
        for (name, path) in self.expected_artifact_paths() {
            if !path.exists() {
                missing.push(name.to_string());
            }
            artifacts.insert(name.to_string(), display(&path));
        }
        ReadinessReport {
            ready: missing.is_empty(),
            missing,
            artifacts,
        }
    }

    /// Build a manifest stamped with the current time.
    pub fn build_manifest(
        &self,
        run_id: &RunId,
        config: &TrainingConfig,
        metrics: &TrainingMetrics,
        data_path: &Path,
    ) -> Result<TrainingManifest> {
        self.build_manifest_at(run_id, config, metrics, data_path, Utc::now())
    }

    /// Build a manifest stamped with `now`.
    ///
    /// The dataset must be readable. Artifacts are hashed only if they exist.
    pub fn build_manifest_at(
        &self,
        run_id: &RunId,
        config: &TrainingConfig,
        metrics: &TrainingMetrics,
        data_path: &Path,
        now: DateTime<Utc>,
    ) -> Result<TrainingManifest> {
        let hash = |path: &Path| {
            file_sha256(path).map_err(|source| Error::Hashing {
                path: path.to_path_buf(),
                source,
            })
        };

        let data_sha256 = hash(data_path)?;

        let mut artifact_hashes = BTreeMap::new();
        let mut artifact_paths = BTreeMap::new();
        for (name, path) in self.expected_artifact_paths() {
            if !path.exists() {
                continue;
            }
            artifact_hashes.insert(name.to_string(), hash(&path)?);
            artifact_paths.insert(name.to_string(), display(&path));
        }

        Ok(TrainingManifest {
            run_id: run_id.to_string(),
            timestamp_utc: format_utc_seconds(now),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: platform_descriptor(),
            data_path: display(data_path),
            data_sha256,
            training_config: config.clone(),
            metrics: metrics.clone(),
            artifact_hashes,
            artifact_paths,
        })
    }

    pub fn write_manifest(&self, manifest: &TrainingManifest) -> Result<PathBuf> {
        let path = self.paths.training_manifest();
        write_json_pretty_atomic(&path, manifest)?;
        info!(
            event = event_names::MANIFEST_WRITTEN,
            run_id = %manifest.run_id,
            path = %path.display(),
            hashed = manifest.artifact_hashes.len(),
            "Training manifest written"
        );
        Ok(path)
    }

    /// `None` when no manifest has been written yet.
    pub fn load_manifest(&self) -> Result<Option<TrainingManifest>> {
        read_json_optional(&self.paths.training_manifest())
    }

    /// `None` when no registry has been written yet.
    pub fn load_registry(&self) -> Result<Option<ModelRegistry>> {
        read_json_optional(&self.paths.model_registry())
    }

    /// Read-modify-write of the registry document.
    ///
    /// An unreadable registry is replaced by an empty one.
    pub fn update_registry(&self, manifest: &TrainingManifest) -> Result<ModelRegistry> {
        let path = self.paths.model_registry();
        let mut registry = match self.load_registry() {
            Ok(Some(registry)) => registry,
            Ok(None) => ModelRegistry::default(),
            Err(e) => {
                warn!(
                    event = event_names::REGISTRY_RESET,
                    path = %path.display(),
                    error = %e,
                    "Registry unreadable, starting fresh"
                );
                ModelRegistry::default()
            }
        };

        registry.record(manifest);
        write_json_pretty_atomic(&path, &registry)?;
        info!(
            event = event_names::REGISTRY_UPDATED,
            run_id = %manifest.run_id,
            runs = registry.runs.len(),
            "Model registry updated"
        );
        Ok(registry)
    }
}
