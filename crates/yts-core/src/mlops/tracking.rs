//! Experiment tracking.
//!
//! The registration pipeline always talks to one [`ExperimentTracker`]. With
//! no backends configured that is a [`NullTracker`]; otherwise a
//! [`FanoutTracker`] forwards every call to each enabled built-in backend.
//! Requested backends that are not built in are reported and skipped, or
//! rejected when tracking is strict.

use crate::logging::event_names;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use yts_common::hash::file_sha256;
use yts_common::{Error, Result, TrackingConfig};

pub const BACKEND_JSONL: &str = "jsonl";
pub const BACKEND_LOG: &str = "log";
pub const BUILTIN_BACKENDS: [&str; 2] = [BACKEND_JSONL, BACKEND_LOG];

const DEFAULT_PROJECT: &str = "youtube-success-ml";

/// Sink for run parameters, metrics and artifacts.
pub trait ExperimentTracker: Send {
    fn name(&self) -> &str;
    fn log_params(&mut self, params: &BTreeMap<String, Value>) -> Result<()>;
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>, step: Option<u64>) -> Result<()>;
    /// Called only for files that exist.
    fn log_artifact(&mut self, path: &Path) -> Result<()>;
    fn end(&mut self) -> Result<()>;
}

/// Tracker that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracker;

impl ExperimentTracker for NullTracker {
    fn name(&self) -> &str {
        "null"
    }
    fn log_params(&mut self, _params: &BTreeMap<String, Value>) -> Result<()> {
        Ok(())
    }
    fn log_metrics(&mut self, _metrics: &BTreeMap<String, f64>, _step: Option<u64>) -> Result<()> {
        Ok(())
    }
    fn log_artifact(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per tracking call to `<dir>/<run_id>.jsonl`.
pub struct JsonlTracker {
    path: PathBuf,
    file: Option<File>,
    run_id: String,
}

impl JsonlTracker {
    pub fn start(
        dir: &Path,
        run_name: &str,
        run_id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.jsonl", run_id));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut tracker = Self {
            path,
            file: Some(file),
            run_id: run_id.to_string(),
        };
        tracker.append("start", json!({ "run_name": run_name, "tags": tags }))?;
        Ok(tracker)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, event: &str, payload: Value) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Tracking(format!(
                "jsonl tracker for {} already ended",
                self.run_id
            )));
        };
        let line = json!({
            "ts": Utc::now().to_rfc3339(),
            "run_id": self.run_id,
            "event": event,
            "data": payload,
        });
        serde_json::to_writer(&mut *file, &line)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

impl ExperimentTracker for JsonlTracker {
    fn name(&self) -> &str {
        BACKEND_JSONL
    }

    fn log_params(&mut self, params: &BTreeMap<String, Value>) -> Result<()> {
        self.append("params", json!(params))
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>, step: Option<u64>) -> Result<()> {
        self.append("metrics", json!({ "metrics": metrics, "step": step }))
    }

    fn log_artifact(&mut self, path: &Path) -> Result<()> {
        let sha256 = file_sha256(path).map_err(|source| Error::Hashing {
            path: path.to_path_buf(),
            source,
        })?;
        self.append(
            "artifact",
            json!({ "path": path.display().to_string(), "sha256": sha256 }),
        )
    }

    fn end(&mut self) -> Result<()> {
        if self.file.is_some() {
            self.append("end", Value::Null)?;
            if let Some(file) = self.file.take() {
                file.sync_all()?;
            }
        }
        Ok(())
    }
}

/// Emits tracking calls as `tracing` events.
pub struct LogTracker {
    run_id: String,
}

impl LogTracker {
    pub fn start(run_name: &str, run_id: &str, tags: &BTreeMap<String, String>) -> Self {
        info!(target: "yts_core::tracking", run_id, run_name, ?tags, "Tracking run started");
        Self {
            run_id: run_id.to_string(),
        }
    }
}

impl ExperimentTracker for LogTracker {
    fn name(&self) -> &str {
        BACKEND_LOG
    }

    fn log_params(&mut self, params: &BTreeMap<String, Value>) -> Result<()> {
        info!(target: "yts_core::tracking", run_id = %self.run_id, params = %json!(params), "Params");
        Ok(())
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>, step: Option<u64>) -> Result<()> {
        info!(target: "yts_core::tracking", run_id = %self.run_id, metrics = %json!(metrics), ?step, "Metrics");
        Ok(())
    }

    fn log_artifact(&mut self, path: &Path) -> Result<()> {
        info!(target: "yts_core::tracking", run_id = %self.run_id, path = %path.display(), "Artifact");
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        info!(target: "yts_core::tracking", run_id = %self.run_id, "Tracking run ended");
        Ok(())
    }
}

/// Availability of one tracking backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrackerCapability {
    pub name: String,
    pub available: bool,
    pub enabled: bool,
}

/// Built-in backends plus any requested backend that is not built in.
pub fn capabilities(config: &TrackingConfig) -> Vec<TrackerCapability> {
    let mut caps: Vec<TrackerCapability> = BUILTIN_BACKENDS
        .iter()
        .map(|name| TrackerCapability {
            name: name.to_string(),
            available: true,
            enabled: config.backends.iter().any(|b| b == name),
        })
        .collect();
    for requested in &config.backends {
        if !BUILTIN_BACKENDS.contains(&requested.as_str()) {
            caps.push(TrackerCapability {
                name: requested.clone(),
                available: false,
                enabled: false,
            });
        }
    }
    caps
}

/// Run tags with `project` and `run_id` defaults filled in.
pub fn run_tags(config: &TrackingConfig, run_id: &str) -> BTreeMap<String, String> {
    let mut tags = config.tags.clone();
    tags.entry("project".to_string())
        .or_insert_with(|| DEFAULT_PROJECT.to_string());
    tags.entry("run_id".to_string())
        .or_insert_with(|| run_id.to_string());
    tags
}

/// Forwards every call to each enabled backend.
///
/// A failing backend is logged and skipped unless tracking is strict.
pub struct FanoutTracker {
    backends: Vec<Box<dyn ExperimentTracker>>,
    strict: bool,
    warnings: Vec<String>,
}

impl FanoutTracker {
    /// Start every requested backend.
    ///
    /// File events go to `config.dir`, or `default_dir` when unset.
    pub fn start(
        config: &TrackingConfig,
        run_name: &str,
        run_id: &str,
        default_dir: &Path,
    ) -> Result<Self> {
        let tags = run_tags(config, run_id);
        let mut backends: Vec<Box<dyn ExperimentTracker>> = Vec::new();
        let mut warnings = Vec::new();

        for name in &config.backends {
            match name.as_str() {
                BACKEND_JSONL => {
                    let dir = config.dir.as_deref().unwrap_or(default_dir);
                    backends.push(Box::new(JsonlTracker::start(dir, run_name, run_id, &tags)?));
                }
                BACKEND_LOG => backends.push(Box::new(LogTracker::start(run_name, run_id, &tags))),
                other => {
                    let msg = format!(
                        "tracking backend '{}' is not available; built-in backends: {}",
                        other,
                        BUILTIN_BACKENDS.join(", ")
                    );
                    if config.strict {
                        return Err(Error::Tracking(msg));
                    }
                    warn!(
                        event = event_names::TRACKING_BACKEND_UNAVAILABLE,
                        backend = other,
                        "{}",
                        msg
                    );
                    warnings.push(msg);
                }
            }
        }

        Ok(Self {
            backends,
            strict: config.strict,
            warnings,
        })
    }

    /// Tracker for the configuration: a fan-out when any backend is
    /// enabled, otherwise a [`NullTracker`].
    pub fn boxed(
        config: &TrackingConfig,
        run_name: &str,
        run_id: &str,
        default_dir: &Path,
    ) -> Result<Box<dyn ExperimentTracker>> {
        let fanout = Self::start(config, run_name, run_id, default_dir)?;
        if fanout.backends.is_empty() {
            Ok(Box::new(NullTracker))
        } else {
            Ok(Box::new(fanout))
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    fn each(
        &mut self,
        mut call: impl FnMut(&mut dyn ExperimentTracker) -> Result<()>,
    ) -> Result<()> {
        for backend in self.backends.iter_mut() {
            if let Err(e) = call(backend.as_mut()) {
                if self.strict {
                    return Err(e);
                }
                warn!(
                    event = event_names::TRACKING_FAILED,
                    backend = backend.name(),
                    error = %e,
                    "Tracking call failed"
                );
            }
        }
        Ok(())
    }
}

impl ExperimentTracker for FanoutTracker {
    fn name(&self) -> &str {
        "fanout"
    }

    fn log_params(&mut self, params: &BTreeMap<String, Value>) -> Result<()> {
        self.each(|b| b.log_params(params))
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>, step: Option<u64>) -> Result<()> {
        self.each(|b| b.log_metrics(metrics, step))
    }

    fn log_artifact(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        self.each(|b| b.log_artifact(path))
    }

    fn end(&mut self) -> Result<()> {
        self.each(|b| b.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_events(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_no_backends_is_null() {
        let dir = TempDir::new().unwrap();
        let tracker =
            FanoutTracker::boxed(&TrackingConfig::default(), "run", "r1", dir.path()).unwrap();
        assert_eq!(tracker.name(), "null");
    }

    #[test]
    fn test_jsonl_backend_records_events() {
        let dir = TempDir::new().unwrap();
        let config = TrackingConfig::default().with_backends(["jsonl"]);
        let mut tracker = FanoutTracker::start(&config, "run", "r1", dir.path()).unwrap();

        let mut metrics = BTreeMap::new();
        metrics.insert("growth_rmse".to_string(), 1.5);
        tracker.log_metrics(&metrics, None).unwrap();
        tracker.log_artifact(&dir.path().join("absent.json")).unwrap();
        tracker.end().unwrap();

        let events = read_events(&dir.path().join("r1.jsonl"));
        let kinds: Vec<_> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["start", "metrics", "end"]);
        assert_eq!(events[0]["data"]["tags"]["project"], DEFAULT_PROJECT);
        assert_eq!(events[1]["data"]["metrics"]["growth_rmse"], 1.5);
    }

    #[test]
    fn test_unknown_backend_warns_or_fails() {
        let dir = TempDir::new().unwrap();
        let config = TrackingConfig::default().with_backends(["mlflow", "log"]);
        let tracker = FanoutTracker::start(&config, "run", "r1", dir.path()).unwrap();
        assert_eq!(tracker.warnings().len(), 1);
        assert_eq!(tracker.backend_names(), vec!["log"]);

        let strict = config.with_strict(true);
        let err = FanoutTracker::start(&strict, "run", "r1", dir.path()).err().unwrap();
        assert!(matches!(err, Error::Tracking(_)));
    }

    #[test]
    fn test_capabilities() {
        let config = TrackingConfig::default().with_backends(["log", "wandb"]);
        let caps = capabilities(&config);
        assert_eq!(caps.len(), 3);
        assert!(caps.iter().any(|c| c.name == "log" && c.enabled));
        assert!(caps.iter().any(|c| c.name == "jsonl" && c.available && !c.enabled));
        assert!(caps.iter().any(|c| c.name == "wandb" && !c.available));
    }

    #[test]
    fn test_explicit_tags_win() {
        let mut config = TrackingConfig::default();
        config.tags.insert("project".into(), "custom".into());
        let tags = run_tags(&config, "r9");
        assert_eq!(tags["project"], "custom");
        assert_eq!(tags["run_id"], "r9");
    }
}
