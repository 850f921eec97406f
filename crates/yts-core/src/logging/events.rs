//! Stable event names and pipeline stages attached to log lines.

use serde::{Deserialize, Serialize};

/// Processing stages of the service and the registration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Artifact loading and verification.
    Load,
    /// Prediction, simulation and recommendation.
    Predict,
    /// Drift baseline building and scoring.
    Drift,
    /// Manifest and registry updates.
    Registry,
    /// Post-training registration run.
    Pipeline,
    /// HTTP serving.
    Serve,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Predict => "predict",
            Stage::Drift => "drift",
            Stage::Registry => "registry",
            Stage::Pipeline => "pipeline",
            Stage::Serve => "serve",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Service lifecycle
    pub const SERVICE_LOADED: &str = "service.loaded";
    pub const SERVICE_LOAD_FAILED: &str = "service.load_failed";
    pub const SERVICE_INVALIDATED: &str = "service.invalidated";

    // Drift
    pub const BASELINE_WRITTEN: &str = "baseline.written";
    pub const BASELINE_UNREADABLE: &str = "baseline.unreadable";
    pub const DRIFT_SCORED: &str = "drift.scored";

    // Registry
    pub const MANIFEST_WRITTEN: &str = "manifest.written";
    pub const REGISTRY_UPDATED: &str = "registry.updated";
    pub const REGISTRY_RESET: &str = "registry.reset";

    // Registration pipeline
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    pub const PIPELINE_ARTIFACT_WRITTEN: &str = "pipeline.artifact_written";
    pub const PIPELINE_FINISHED: &str = "pipeline.finished";

    // Tracking
    pub const TRACKING_BACKEND_UNAVAILABLE: &str = "tracking.backend_unavailable";
    pub const TRACKING_FAILED: &str = "tracking.failed";

    // HTTP
    pub const SERVER_STARTED: &str = "server.started";
    pub const SERVER_STOPPED: &str = "server.stopped";
    pub const REQUEST_HANDLED: &str = "request.handled";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Registry).unwrap(), "\"registry\"");
        assert_eq!(Stage::Pipeline.to_string(), "pipeline");
    }
}
