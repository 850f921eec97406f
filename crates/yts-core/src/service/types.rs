//! Request and response contracts of the intelligence service.
//!
//! Field constraints are stated once, on the request structs, and checked by
//! [`Validate::validate`] before any model is invoked. Validation also
//! normalizes: text fields are trimmed.

use crate::features::{FeatureView, Target};
use crate::mlops::tracking::TrackerCapability;
use crate::models::{ClusterAssignment, ClusterProfile, FeatureImportance, Prediction};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yts_common::{Error, Result};

pub const MAX_UPLOADS: i64 = 2_000_000;
pub const MAX_AGE: i64 = 100;
pub const MAX_TEXT_LEN: usize = 100;
pub const MAX_STEP: i64 = 200_000;
pub const MAX_BATCH_ITEMS: usize = 500;
pub const MAX_TOP_N: usize = 50;

pub const DEFAULT_TOP_N: usize = 15;
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;
pub const DEFAULT_MIN_CATEGORY_FREQUENCY: f64 = 0.01;

/// Check field constraints and return the normalized value.
pub trait Validate: Sized {
    fn validate(self) -> Result<Self>;
}

fn check_int(field: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::validation(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
    Ok(())
}

fn check_float(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(value >= min && value <= max) {
        return Err(Error::validation(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
    Ok(())
}

fn check_text(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_TEXT_LEN {
        return Err(Error::validation(
            field,
            format!("must be 1 to {} characters after trimming", MAX_TEXT_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

fn check_items<T: Validate>(items: Vec<T>) -> Result<Vec<T>> {
    if items.is_empty() || items.len() > MAX_BATCH_ITEMS {
        return Err(Error::validation(
            "items",
            format!(
                "must contain 1 to {} items, got {}",
                MAX_BATCH_ITEMS,
                items.len()
            ),
        ));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            item.validate().map_err(|e| match e {
                Error::Validation { field, message } => {
                    Error::validation(format!("items[{}].{}", i, field), message)
                }
                other => other,
            })
        })
        .collect()
}

/// One channel to predict for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionRequest {
    /// Total uploads, 0 to 2,000,000.
    pub uploads: i64,
    /// Content category, 1 to 100 characters.
    pub category: String,
    /// Country name, 1 to 100 characters.
    pub country: String,
    /// Channel age in years, 0 to 100.
    pub age: i64,
}

impl Validate for PredictionRequest {
    fn validate(self) -> Result<Self> {
        check_int("uploads", self.uploads, 0, MAX_UPLOADS)?;
        check_int("age", self.age, 0, MAX_AGE)?;
        Ok(Self {
            category: check_text("category", self.category)?,
            country: check_text("country", self.country)?,
            ..self
        })
    }
}

impl FeatureView for PredictionRequest {
    fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "uploads" => Some(self.uploads as f64),
            "age" => Some(self.age as f64),
            _ => None,
        }
    }

    fn categorical(&self, column: &str) -> Option<String> {
        match column {
            "category" => Some(self.category.clone()),
            "country" => Some(self.country.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchPredictionRequest {
    /// 1 to 500 items.
    pub items: Vec<PredictionRequest>,
}

impl Validate for BatchPredictionRequest {
    fn validate(self) -> Result<Self> {
        Ok(Self {
            items: check_items(self.items)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchPredictionSummary {
    pub count: usize,
    pub avg_predicted_subscribers: f64,
    pub avg_predicted_earnings: f64,
    pub avg_predicted_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchPredictionResponse {
    pub records: Vec<Prediction>,
    pub summary: BatchPredictionSummary,
}

/// What-if sweep over an uploads range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimulationRequest {
    pub category: String,
    pub country: String,
    pub age: i64,
    pub start_uploads: i64,
    /// Inclusive; must be >= `start_uploads`.
    pub end_uploads: i64,
    /// 1 to 200,000.
    pub step: i64,
}

impl Validate for SimulationRequest {
    fn validate(self) -> Result<Self> {
        check_int("age", self.age, 0, MAX_AGE)?;
        check_int("start_uploads", self.start_uploads, 0, MAX_UPLOADS)?;
        check_int("end_uploads", self.end_uploads, 0, MAX_UPLOADS)?;
        check_int("step", self.step, 1, MAX_STEP)?;
        if self.end_uploads < self.start_uploads {
            return Err(Error::validation(
                "end_uploads",
                "end_uploads must be >= start_uploads",
            ));
        }
        Ok(Self {
            category: check_text("category", self.category)?,
            country: check_text("country", self.country)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimulationPoint {
    pub uploads: i64,
    #[serde(flatten)]
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimulationResponse {
    pub input: SimulationRequest,
    pub points: Vec<SimulationPoint>,
    pub best_uploads_by_growth: i64,
    pub best_uploads_by_earnings: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationResponse {
    pub prediction: Prediction,
    pub cluster: ClusterAssignment,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

fn default_target() -> Target {
    Target::Subscribers
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureImportanceQuery {
    #[serde(default = "default_target")]
    pub target: Target,
    /// 1 to 50.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for FeatureImportanceQuery {
    fn default() -> Self {
        Self {
            target: default_target(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl Validate for FeatureImportanceQuery {
    fn validate(self) -> Result<Self> {
        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            return Err(Error::validation(
                "top_n",
                format!("must be between 1 and {}, got {}", MAX_TOP_N, self.top_n),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FeatureImportanceResponse {
    pub target: Target,
    pub records: Vec<FeatureImportance>,
}

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

fn default_min_category_frequency() -> f64 {
    DEFAULT_MIN_CATEGORY_FREQUENCY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DriftCheckRequest {
    /// 1 to 500 items.
    pub items: Vec<PredictionRequest>,
    /// 0.1 to 10.0.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// 0.0 to 1.0.
    #[serde(default = "default_min_category_frequency")]
    pub min_category_frequency: f64,
}

impl DriftCheckRequest {
    pub fn new(items: Vec<PredictionRequest>) -> Self {
        Self {
            items,
            z_threshold: DEFAULT_Z_THRESHOLD,
            min_category_frequency: DEFAULT_MIN_CATEGORY_FREQUENCY,
        }
    }
}

impl Validate for DriftCheckRequest {
    fn validate(self) -> Result<Self> {
        check_float("z_threshold", self.z_threshold, 0.1, 10.0)?;
        check_float(
            "min_category_frequency",
            self.min_category_frequency,
            0.0,
            1.0,
        )?;
        Ok(Self {
            items: check_items(self.items)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterSummaryResponse {
    pub records: Vec<ClusterProfile>,
}

/// What the MLOps side of this deployment can do right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapabilitiesResponse {
    pub experiment_tracking: Vec<TrackerCapability>,
    /// `baseline`, `manifest` and `registry` presence.
    pub documents: BTreeMap<String, bool>,
}
