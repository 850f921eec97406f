//! Artifact path resolution.
//!
//! Resolution order for every directory: explicit override, then the
//! matching `YTS_*` variable, then a default derived from its parent.

use std::path::{Path, PathBuf};

pub const ENV_PROJECT_ROOT: &str = "YTS_PROJECT_ROOT";
pub const ENV_DATA_PATH: &str = "YTS_DATA_PATH";
pub const ENV_ARTIFACT_DIR: &str = "YTS_ARTIFACT_DIR";
pub const ENV_MODEL_DIR: &str = "YTS_MODEL_DIR";
pub const ENV_REPORT_DIR: &str = "YTS_REPORT_DIR";
pub const ENV_MLOPS_DIR: &str = "YTS_MLOPS_DIR";

/// Dataset file name under `<root>/data`.
pub const DATASET_FILE_NAME: &str = "channels.jsonl";

/// Fixed artifact file names.
pub mod files {
    pub const SUPERVISED_BUNDLE: &str = "supervised_bundle.zip";
    pub const CLUSTERING_BUNDLE: &str = "clustering_bundle.zip";
    pub const CLUSTERED_CHANNELS: &str = "clustered_channels.jsonl";
    pub const TRAINING_METRICS: &str = "training_metrics.json";
    pub const DATA_QUALITY_REPORT: &str = "data_quality_report.json";
    pub const TRAINING_BASELINE: &str = "training_baseline.json";
    pub const FEATURE_STORE_SNAPSHOT: &str = "feature_store_snapshot.jsonl";
    pub const TRAINING_MANIFEST: &str = "training_manifest.json";
    pub const MODEL_REGISTRY: &str = "model_registry.json";
}

/// Resolved locations of every persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub project_root: PathBuf,
    pub data_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub model_dir: PathBuf,
    pub report_dir: PathBuf,
    pub mlops_dir: PathBuf,
}

impl ArtifactPaths {
    /// Default layout under a project root.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let project_root = root.into();
        let artifact_dir = project_root.join("artifacts");
        Self::from_parts(project_root, None, artifact_dir, None, None, None)
    }

    /// Default layout under an artifact directory (the dataset path stays
    /// relative to the artifact directory's parent).
    pub fn from_artifact_dir(artifact_dir: impl Into<PathBuf>) -> Self {
        let artifact_dir = artifact_dir.into();
        let project_root = artifact_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| artifact_dir.clone());
        Self::from_parts(project_root, None, artifact_dir, None, None, None)
    }

    /// Resolve from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(super::env_lookup)
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let project_root = lookup(ENV_PROJECT_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(default_project_root);
        let artifact_dir = lookup(ENV_ARTIFACT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| project_root.join("artifacts"));
        Self::from_parts(
            project_root,
            lookup(ENV_DATA_PATH).map(PathBuf::from),
            artifact_dir,
            lookup(ENV_MODEL_DIR).map(PathBuf::from),
            lookup(ENV_REPORT_DIR).map(PathBuf::from),
            lookup(ENV_MLOPS_DIR).map(PathBuf::from),
        )
    }

    fn from_parts(
        project_root: PathBuf,
        data_path: Option<PathBuf>,
        artifact_dir: PathBuf,
        model_dir: Option<PathBuf>,
        report_dir: Option<PathBuf>,
        mlops_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            data_path: data_path
                .unwrap_or_else(|| project_root.join("data").join(DATASET_FILE_NAME)),
            model_dir: model_dir.unwrap_or_else(|| artifact_dir.join("models")),
            report_dir: report_dir.unwrap_or_else(|| artifact_dir.join("reports")),
            mlops_dir: mlops_dir.unwrap_or_else(|| artifact_dir.join("mlops")),
            artifact_dir,
            project_root,
        }
    }

    /// Override the dataset location.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Override the model directory.
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Override the report directory.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn supervised_bundle(&self) -> PathBuf {
        self.model_dir.join(files::SUPERVISED_BUNDLE)
    }

    pub fn clustering_bundle(&self) -> PathBuf {
        self.model_dir.join(files::CLUSTERING_BUNDLE)
    }

    pub fn clustered_channels(&self) -> PathBuf {
        self.model_dir.join(files::CLUSTERED_CHANNELS)
    }

    pub fn training_metrics(&self) -> PathBuf {
        self.report_dir.join(files::TRAINING_METRICS)
    }

    pub fn data_quality_report(&self) -> PathBuf {
        self.report_dir.join(files::DATA_QUALITY_REPORT)
    }

    pub fn training_baseline(&self) -> PathBuf {
        self.report_dir.join(files::TRAINING_BASELINE)
    }

    pub fn feature_store_snapshot(&self) -> PathBuf {
        self.report_dir.join(files::FEATURE_STORE_SNAPSHOT)
    }

    pub fn training_manifest(&self) -> PathBuf {
        self.mlops_dir.join(files::TRAINING_MANIFEST)
    }

    pub fn model_registry(&self) -> PathBuf {
        self.mlops_dir.join(files::MODEL_REGISTRY)
    }

    /// Directory for file-based experiment tracking events.
    pub fn tracking_dir(&self) -> PathBuf {
        self.mlops_dir.join("tracking")
    }
}

/// Current directory, falling back to the platform data directory.
fn default_project_root() -> PathBuf {
    std::env::current_dir()
        .ok()
        .or_else(|| dirs::data_dir().map(|d| d.join("youtube_success")))
        .unwrap_or_else(|| PathBuf::from("."))
}
