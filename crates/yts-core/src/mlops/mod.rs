//! MLOps plumbing around the trained artifacts.
//!
//! - `registry`: expected artifacts, readiness, training manifest, run registry
//! - `drift`: training-time baseline and request drift scoring
//! - `quality`: data-quality report for the processed table
//! - `feature_store`: point-in-time feature snapshot export
//! - `tracking`: experiment tracking backends behind one trait

pub mod drift;
pub mod feature_store;
pub mod quality;
pub mod registry;
pub mod tracking;

pub use drift::{
    build_baseline, load_baseline, save_baseline, score, DriftBaseline, DriftRecord, DriftReport,
    DriftSummary, NumericBaseline, Severity,
};
pub use registry::{
    ArtifactRegistry, ModelRegistry, ReadinessReport, RegistryEntry, TrainingManifest,
    TrainingMetrics,
};
pub use tracking::{ExperimentTracker, FanoutTracker, NullTracker, TrackerCapability};
