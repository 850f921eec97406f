//! Intelligence service: composes the prediction, clustering and drift
//! components into the user-facing operations.
//!
//! An [`IntelligenceService`] is immutable once loaded. [`ServiceHandle`]
//! owns the lazy, single-load lifecycle shared by the HTTP workers.

pub mod types;

pub use types::*;

use crate::features::Target;
use crate::logging::{event_names, Stage};
use crate::mlops::drift::{self, DriftBaseline, DriftReport};
use crate::models::{
    clustering, supervised, ClusterAssignment, ClusteringBundle, Prediction, PredictionBundle,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};
use yts_common::{ArtifactPaths, Error, Result};

/// Advice emitted by the recommendation rules, in trigger-check order.
pub mod advice {
    pub const CADENCE: &str = "Increase publishing cadence with a consistent weekly release plan.";
    pub const RETENTION: &str =
        "Prioritize retention-focused video formats and stronger first-minute hooks.";
    pub const MONETIZATION: &str =
        "Expand monetization mix with sponsorship tiers and affiliate bundles.";
    pub const DISCOVERY: &str =
        "Use collaboration and shorts strategy to accelerate early channel discovery.";
    pub const MAINTAIN: &str =
        "Maintain current content velocity and optimize around top-performing content pillars.";
}

const LOW_UPLOADS: i64 = 200;
const LOW_GROWTH: f64 = 50_000.0;
const LOW_EARNINGS: f64 = 1_000_000.0;
const YOUNG_CHANNEL_YEARS: i64 = 2;
const HIGH_RISK_GROWTH: f64 = 20_000.0;
const MEDIUM_RISK_GROWTH: f64 = 120_000.0;

/// Risk tier from predicted 30-day growth.
pub fn risk_level(predicted_growth: f64) -> RiskLevel {
    if predicted_growth < HIGH_RISK_GROWTH {
        RiskLevel::High
    } else if predicted_growth < MEDIUM_RISK_GROWTH {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Independent rule triggers; falls back to a single maintain-strategy tip.
pub fn recommendations(request: &PredictionRequest, prediction: &Prediction) -> Vec<String> {
    let rules = [
        (request.uploads < LOW_UPLOADS, advice::CADENCE),
        (prediction.predicted_growth < LOW_GROWTH, advice::RETENTION),
        (prediction.predicted_earnings < LOW_EARNINGS, advice::MONETIZATION),
        (request.age < YOUNG_CHANNEL_YEARS, advice::DISCOVERY),
    ];
    let mut out: Vec<String> = rules
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, text)| text.to_string())
        .collect();
    if out.is_empty() {
        out.push(advice::MAINTAIN.to_string());
    }
    out
}

/// Loaded artifacts and the operations over them.
#[derive(Debug, Clone)]
pub struct IntelligenceService {
    supervised: PredictionBundle,
    clustering: ClusteringBundle,
    baseline: Option<DriftBaseline>,
}

impl IntelligenceService {
    pub fn new(
        supervised: PredictionBundle,
        clustering: ClusteringBundle,
        baseline: Option<DriftBaseline>,
    ) -> Self {
        Self {
            supervised,
            clustering,
            baseline,
        }
    }

    /// Load both bundles and, if present and readable, the drift baseline.
    ///
    /// Missing bundles are reported together.
    pub fn from_artifacts(paths: &ArtifactPaths) -> Result<Self> {
        let started = Instant::now();
        let required = [
            (supervised::ARTIFACT_NAME, paths.supervised_bundle()),
            (clustering::ARTIFACT_NAME, paths.clustering_bundle()),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::ArtifactsUnavailable { missing });
        }

        let supervised = PredictionBundle::load(&paths.supervised_bundle())?;
        let clustering = ClusteringBundle::load(&paths.clustering_bundle())?;
        let baseline = match drift::load_baseline(&paths.training_baseline()) {
            Ok(baseline) => baseline,
            Err(e) => {
                // drift checks report BaselineMissing; predictions still load
                warn!(
                    event = event_names::BASELINE_UNREADABLE,
                    stage = %Stage::Load,
                    error = %e,
                    "Ignoring unreadable drift baseline"
                );
                None
            }
        };

        info!(
            event = event_names::SERVICE_LOADED,
            stage = %Stage::Load,
            model_dir = %paths.model_dir.display(),
            clusters = clustering.k(),
            baseline = baseline.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Intelligence service loaded"
        );
        Ok(Self::new(supervised, clustering, baseline))
    }

    pub fn supervised(&self) -> &PredictionBundle {
        &self.supervised
    }

    pub fn clustering(&self) -> &ClusteringBundle {
        &self.clustering
    }

    pub fn baseline(&self) -> Option<&DriftBaseline> {
        self.baseline.as_ref()
    }

    pub fn predict(&self, request: PredictionRequest) -> Result<Prediction> {
        let request = request.validate()?;
        Ok(self.supervised.predict(&request))
    }

    pub fn predict_batch(&self, request: BatchPredictionRequest) -> Result<BatchPredictionResponse> {
        let request = request.validate()?;
        let records = self.supervised.predict_batch(&request.items);

        let n = records.len() as f64;
        let avg = |f: fn(&Prediction) -> f64| records.iter().map(f).sum::<f64>() / n;
        let summary = BatchPredictionSummary {
            count: records.len(),
            avg_predicted_subscribers: avg(|p| p.predicted_subscribers),
            avg_predicted_earnings: avg(|p| p.predicted_earnings),
            avg_predicted_growth: avg(|p| p.predicted_growth),
        };
        Ok(BatchPredictionResponse { records, summary })
    }

    /// Predict at `start, start + step, ...` while `uploads <= end`.
    pub fn simulate(&self, request: SimulationRequest) -> Result<SimulationResponse> {
        let request = request.validate()?;

        let mut points = Vec::new();
        let mut uploads = request.start_uploads;
        while uploads <= request.end_uploads {
            let row = PredictionRequest {
                uploads,
                category: request.category.clone(),
                country: request.country.clone(),
                age: request.age,
            };
            points.push(SimulationPoint {
                uploads,
                prediction: self.supervised.predict(&row),
            });
            uploads += request.step;
        }

        let best_by = |target: Target| {
            let mut best = &points[0];
            for point in &points[1..] {
                if point.prediction.get(target) > best.prediction.get(target) {
                    best = point;
                }
            }
            best.uploads
        };
        let best_uploads_by_growth = best_by(Target::Growth);
        let best_uploads_by_earnings = best_by(Target::Earnings);

        Ok(SimulationResponse {
            input: request,
            points,
            best_uploads_by_growth,
            best_uploads_by_earnings,
        })
    }

    /// Predict, cluster the predicted profile, then apply the advice rules.
    pub fn recommendation(&self, request: PredictionRequest) -> Result<RecommendationResponse> {
        let request = request.validate()?;
        let prediction = self.supervised.predict(&request);
        let cluster: ClusterAssignment = self.clustering.assign(
            request.uploads as f64,
            prediction.predicted_subscribers,
            prediction.predicted_earnings,
            prediction.predicted_growth,
        );

        Ok(RecommendationResponse {
            risk_level: risk_level(prediction.predicted_growth),
            recommendations: recommendations(&request, &prediction),
            prediction,
            cluster,
        })
    }

    pub fn feature_importance(
        &self,
        query: FeatureImportanceQuery,
    ) -> Result<FeatureImportanceResponse> {
        let query = query.validate()?;
        Ok(FeatureImportanceResponse {
            target: query.target,
            records: self.supervised.feature_importance(query.target, query.top_n),
        })
    }

    /// Fails with [`Error::BaselineMissing`] when no baseline was loaded.
    pub fn drift_check(&self, request: DriftCheckRequest) -> Result<DriftReport> {
        let request = request.validate()?;
        let baseline = self.baseline.as_ref().ok_or(Error::BaselineMissing)?;
        Ok(drift::score(
            &request.items,
            baseline,
            request.z_threshold,
            request.min_category_frequency,
        ))
    }

    pub fn cluster_summary(&self) -> ClusterSummaryResponse {
        ClusterSummaryResponse {
            records: self.clustering.profiles().to_vec(),
        }
    }
}

/// Lazily loaded, shared service instance.
///
/// The first successful [`get`](Self::get) loads under the lock, so
/// concurrent callers never load twice. Failed loads are not cached.
#[derive(Debug)]
pub struct ServiceHandle {
    paths: ArtifactPaths,
    slot: Mutex<Option<Arc<IntelligenceService>>>,
}

impl ServiceHandle {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            slot: Mutex::new(None),
        }
    }

    /// Handle that is already loaded with `service`.
    pub fn with_service(paths: ArtifactPaths, service: IntelligenceService) -> Self {
        Self {
            paths,
            slot: Mutex::new(Some(Arc::new(service))),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn get(&self) -> Result<Arc<IntelligenceService>> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(service) = slot.as_ref() {
            return Ok(Arc::clone(service));
        }
        match IntelligenceService::from_artifacts(&self.paths) {
            Ok(service) => {
                let service = Arc::new(service);
                *slot = Some(Arc::clone(&service));
                Ok(service)
            }
            Err(e) => {
                warn!(
                    event = event_names::SERVICE_LOAD_FAILED,
                    stage = %Stage::Load,
                    error = %e,
                    "Intelligence service unavailable"
                );
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Drop the loaded instance; the next `get` reloads from disk.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            info!(event = event_names::SERVICE_INVALIDATED, "Intelligence service invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uploads: i64, age: i64) -> PredictionRequest {
        PredictionRequest {
            uploads,
            category: "Music".into(),
            country: "India".into(),
            age,
        }
    }

    fn prediction(growth: f64, earnings: f64) -> Prediction {
        Prediction {
            predicted_subscribers: 1.0,
            predicted_earnings: earnings,
            predicted_growth: growth,
        }
    }

    #[test]
    fn test_risk_tiers() {
        assert_eq!(risk_level(0.0), RiskLevel::High);
        assert_eq!(risk_level(19_999.9), RiskLevel::High);
        assert_eq!(risk_level(20_000.0), RiskLevel::Medium);
        assert_eq!(risk_level(119_999.0), RiskLevel::Medium);
        assert_eq!(risk_level(120_000.0), RiskLevel::Low);
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let out = recommendations(&request(10, 1), &prediction(10.0, 10.0));
        assert_eq!(
            out,
            vec![
                advice::CADENCE,
                advice::RETENTION,
                advice::MONETIZATION,
                advice::DISCOVERY
            ]
        );
    }

    #[test]
    fn test_no_rule_gives_maintain() {
        let out = recommendations(&request(500, 5), &prediction(1e6, 1e7));
        assert_eq!(out, vec![advice::MAINTAIN]);
    }

    #[test]
    fn test_handle_reports_missing_bundles() {
        let dir = tempfile::TempDir::new().unwrap();
        let handle = ServiceHandle::new(ArtifactPaths::from_root(dir.path()));
        match handle.get() {
            Err(Error::ArtifactsUnavailable { missing }) => {
                assert_eq!(missing, vec!["supervised_bundle", "clustering_bundle"]);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert!(!handle.is_loaded());
    }
}
