//! JSON Schema generation for request, response and document types.
//!
//! ```bash
//! # List available schema types
//! yts-core schema --list
//!
//! # One type, or everything
//! yts-core schema PredictionRequest
//! yts-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::mlops::{
    DriftBaseline, DriftReport, ModelRegistry, ReadinessReport, TrainingManifest,
};
pub use crate::models::{ClusterProfile, Prediction};
pub use crate::service::{
    BatchPredictionRequest, BatchPredictionResponse, CapabilitiesResponse, ClusterSummaryResponse,
    DriftCheckRequest, FeatureImportanceQuery, FeatureImportanceResponse, HealthResponse,
    PredictionRequest, RecommendationResponse, SimulationRequest, SimulationResponse,
};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Requests
        ("PredictionRequest", "Single channel prediction input"),
        ("BatchPredictionRequest", "1 to 500 prediction inputs"),
        ("SimulationRequest", "Uploads sweep for what-if simulation"),
        ("FeatureImportanceQuery", "Target and top_n for importances"),
        ("DriftCheckRequest", "Items and thresholds for drift scoring"),
        // Responses
        ("Prediction", "Predicted subscribers, earnings and growth"),
        ("BatchPredictionResponse", "Batch predictions with averages"),
        ("SimulationResponse", "Simulation points and best uploads"),
        (
            "RecommendationResponse",
            "Prediction, cluster, risk tier and advice",
        ),
        ("FeatureImportanceResponse", "Ranked expanded-feature importances"),
        ("DriftReport", "Per-item drift warnings and summary"),
        ("ClusterSummaryResponse", "Cached cluster profiles"),
        ("ClusterProfile", "Aggregates for one cluster"),
        ("HealthResponse", "Liveness status"),
        ("ReadinessReport", "Artifact readiness with missing names"),
        ("CapabilitiesResponse", "Tracking backends and MLOps documents"),
        // Persisted documents
        ("DriftBaseline", "Training-time feature distributions"),
        ("TrainingManifest", "Provenance record for one training run"),
        ("ModelRegistry", "Registered runs and the active run id"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns `None` if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "PredictionRequest" => schema_for!(PredictionRequest),
        "BatchPredictionRequest" => schema_for!(BatchPredictionRequest),
        "SimulationRequest" => schema_for!(SimulationRequest),
        "FeatureImportanceQuery" => schema_for!(FeatureImportanceQuery),
        "DriftCheckRequest" => schema_for!(DriftCheckRequest),
        "Prediction" => schema_for!(Prediction),
        "BatchPredictionResponse" => schema_for!(BatchPredictionResponse),
        "SimulationResponse" => schema_for!(SimulationResponse),
        "RecommendationResponse" => schema_for!(RecommendationResponse),
        "FeatureImportanceResponse" => schema_for!(FeatureImportanceResponse),
        "DriftReport" => schema_for!(DriftReport),
        "ClusterSummaryResponse" => schema_for!(ClusterSummaryResponse),
        "ClusterProfile" => schema_for!(ClusterProfile),
        "HealthResponse" => schema_for!(HealthResponse),
        "ReadinessReport" => schema_for!(ReadinessReport),
        "CapabilitiesResponse" => schema_for!(CapabilitiesResponse),
        "DriftBaseline" => schema_for!(DriftBaseline),
        "TrainingManifest" => schema_for!(TrainingManifest),
        "ModelRegistry" => schema_for!(ModelRegistry),
        _ => return None,
    };

    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    available_schemas()
        .into_iter()
        .filter_map(|(name, _)| generate_schema(name).map(|s| (name.to_string(), s)))
        .collect()
}
