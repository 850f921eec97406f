//! Socket-free request routing.
//!
//! [`Router::handle`] owns route matching, query parsing, body decoding and
//! the error-to-status mapping. The server only moves bytes.

use super::metrics::{self, RequestMetrics, UNMATCHED_PATH};
use crate::features::Target;
use crate::fsutil::read_json_optional;
use crate::logging::{event_names, Stage};
use crate::mlops::registry::ArtifactRegistry;
use crate::mlops::tracking;
use crate::service::{
    BatchPredictionRequest, CapabilitiesResponse, DriftCheckRequest, FeatureImportanceQuery,
    HealthResponse, IntelligenceService, PredictionRequest, ServiceHandle, SimulationRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use yts_common::{Error, Result, TrackingConfig};

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Health,
    Ready,
    Predict,
    PredictBatch,
    Simulate,
    Recommendation,
    FeatureImportance,
    DriftCheck,
    Manifest,
    Registry,
    Capabilities,
    ClusterSummary,
    Metrics,
}

/// Route table: path, method, endpoint.
const ROUTES: [(&str, Method, Endpoint); 13] = [
    ("/health", Method::Get, Endpoint::Health),
    ("/ready", Method::Get, Endpoint::Ready),
    ("/predict", Method::Post, Endpoint::Predict),
    ("/predict/batch", Method::Post, Endpoint::PredictBatch),
    ("/predict/simulate", Method::Post, Endpoint::Simulate),
    ("/predict/recommendation", Method::Post, Endpoint::Recommendation),
    ("/predict/feature-importance", Method::Get, Endpoint::FeatureImportance),
    ("/mlops/drift-check", Method::Post, Endpoint::DriftCheck),
    ("/mlops/manifest", Method::Get, Endpoint::Manifest),
    ("/mlops/registry", Method::Get, Endpoint::Registry),
    ("/mlops/capabilities", Method::Get, Endpoint::Capabilities),
    ("/clusters/summary", Method::Get, Endpoint::ClusterSummary),
    ("/metrics", Method::Get, Endpoint::Metrics),
];

/// Every routed path, in table order.
pub fn route_paths() -> Vec<&'static str> {
    ROUTES.iter().map(|(path, _, _)| *path).collect()
}

/// A fully rendered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body,
            },
            Err(e) => Self::detail(500, format!("response serialization failed: {}", e)),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: body.into(),
        }
    }

    /// `{"detail": "<message>"}`.
    pub fn detail(status: u16, message: impl Into<String>) -> Self {
        let body = json!({ "detail": message.into() }).to_string();
        Self {
            status,
            content_type: JSON,
            body,
        }
    }

    /// Map a service error onto its stable status and body.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Validation { field, message } => Self::json(
                422,
                &json!({ "detail": { "field": field, "message": message } }),
            ),
            _ => {
                let status = err.http_status();
                if status >= 500 && status != 503 {
                    error!(
                        event = event_names::REQUEST_HANDLED,
                        code = err.code(),
                        error = %err,
                        "Request failed"
                    );
                }
                Self::detail(status, err.to_string())
            }
        }
    }

    /// Parse the body as JSON. Only meaningful for JSON responses.
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Decode a JSON body. Syntax errors are 400; well-formed JSON with the
/// wrong shape is a 422 against the `body` field.
fn decode<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| match e.classify() {
        serde_json::error::Category::Data => Response::from_error(&Error::validation(
            "body",
            e.to_string(),
        )),
        _ => Response::detail(400, format!("malformed JSON body: {}", e)),
    })
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a query string into decoded pairs; later keys win.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn feature_importance_query(params: &BTreeMap<String, String>) -> Result<FeatureImportanceQuery> {
    let mut query = FeatureImportanceQuery::default();
    if let Some(raw) = params.get("target") {
        query.target = raw.trim().parse::<Target>()?;
    }
    if let Some(raw) = params.get("top_n") {
        query.top_n = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::validation("top_n", format!("not an integer: '{}'", raw)))?;
    }
    Ok(query)
}

/// Serve a persisted document as-is, or 404 with `missing` as detail.
fn document(path: &Path, missing: &str) -> Response {
    match read_json_optional::<Value>(path) {
        Ok(Some(doc)) => Response::json(200, &doc),
        Ok(None) => Response::detail(404, missing),
        Err(e) => Response::from_error(&e),
    }
}

/// Request router over one artifact layout.
pub struct Router {
    service: Arc<ServiceHandle>,
    registry: ArtifactRegistry,
    tracking: TrackingConfig,
    metrics: RequestMetrics,
}

impl Router {
    pub fn new(service: Arc<ServiceHandle>, tracking: TrackingConfig) -> Result<Self> {
        let metrics = RequestMetrics::new()
            .map_err(|e| Error::Server(format!("metrics registry: {}", e)))?;
        let registry = ArtifactRegistry::new(service.paths().clone());
        Ok(Self {
            service,
            registry,
            tracking,
            metrics,
        })
    }

    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Route one request and record its telemetry.
    pub fn handle(&self, method: &str, url: &str, body: &[u8]) -> Response {
        let started = Instant::now();
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let matched = ROUTES.iter().find(|(p, _, _)| *p == path);
        let response = match matched {
            None => Response::detail(404, "Not Found"),
            Some((_, expected, _)) if !method.eq_ignore_ascii_case(expected.as_str()) => {
                Response::detail(405, "Method Not Allowed")
            }
            Some((_, _, endpoint)) => self.dispatch(*endpoint, query, body),
        };

        let label = matched.map(|(p, _, _)| *p).unwrap_or(UNMATCHED_PATH);
        let elapsed = started.elapsed();
        self.metrics.observe(label, elapsed.as_secs_f64());
        debug!(
            event = event_names::REQUEST_HANDLED,
            stage = %Stage::Serve,
            method,
            path,
            status = response.status,
            elapsed_us = elapsed.as_micros() as u64,
            "Request handled"
        );
        response
    }

    fn dispatch(&self, endpoint: Endpoint, query: &str, body: &[u8]) -> Response {
        match endpoint {
            Endpoint::Health => Response::json(200, &HealthResponse::ok()),
            Endpoint::Ready => {
                let report = self.registry.check_ready();
                if report.ready {
                    Response::text(200, "ready\n")
                } else {
                    Response::text(503, format!("not_ready missing={}\n", report.missing.join(",")))
                }
            }
            Endpoint::Predict => self.with_body(body, |svc, req: PredictionRequest| {
                svc.predict(req)
            }),
            Endpoint::PredictBatch => self.with_body(body, |svc, req: BatchPredictionRequest| {
                svc.predict_batch(req)
            }),
            Endpoint::Simulate => self.with_body(body, |svc, req: SimulationRequest| {
                svc.simulate(req)
            }),
            Endpoint::Recommendation => self.with_body(body, |svc, req: PredictionRequest| {
                svc.recommendation(req)
            }),
            Endpoint::FeatureImportance => {
                let query = match feature_importance_query(&parse_query(query)) {
                    Ok(q) => q,
                    Err(e) => return Response::from_error(&e),
                };
                self.with_service(|svc| svc.feature_importance(query))
            }
            Endpoint::DriftCheck => self.with_body(body, |svc, req: DriftCheckRequest| {
                svc.drift_check(req)
            }),
            Endpoint::Manifest => {
                document(&self.registry.paths().training_manifest(), "Manifest not found")
            }
            Endpoint::Registry => {
                document(&self.registry.paths().model_registry(), "Registry not found")
            }
            Endpoint::Capabilities => Response::json(200, &self.capabilities()),
            Endpoint::ClusterSummary => {
                self.with_service(|svc| Ok(svc.cluster_summary()))
            }
            Endpoint::Metrics => match self.metrics.render() {
                Ok(text) => Response {
                    status: 200,
                    content_type: metrics::CONTENT_TYPE,
                    body: text,
                },
                Err(e) => Response::detail(500, format!("failed to render metrics: {}", e)),
            },
        }
    }

    fn capabilities(&self) -> CapabilitiesResponse {
        let paths = self.registry.paths();
        let documents = [
            ("baseline", paths.training_baseline()),
            ("manifest", paths.training_manifest()),
            ("registry", paths.model_registry()),
        ]
        .into_iter()
        .map(|(name, path)| (name.to_string(), path.exists()))
        .collect();
        CapabilitiesResponse {
            experiment_tracking: tracking::capabilities(&self.tracking),
            documents,
        }
    }

    fn with_service<T: Serialize>(
        &self,
        op: impl FnOnce(&IntelligenceService) -> Result<T>,
    ) -> Response {
        match self.service.get().and_then(|svc| op(svc.as_ref())) {
            Ok(value) => Response::json(200, &value),
            Err(e) => Response::from_error(&e),
        }
    }

    /// Decode first so malformed requests are rejected even when the
    /// artifacts are unavailable.
    fn with_body<R: DeserializeOwned, T: Serialize>(
        &self,
        body: &[u8],
        op: impl FnOnce(&IntelligenceService, R) -> Result<T>,
    ) -> Response {
        let request = match decode::<R>(body) {
            Ok(r) => r,
            Err(response) => return response,
        };
        self.with_service(|svc| op(svc, request))
    }
}
