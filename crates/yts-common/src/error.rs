//! Error types for the YouTube success intelligence service.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//! - A stable HTTP status for the serving boundary
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Model Artifacts Unavailable
//!   Reason: model artifacts unavailable: missing supervised_bundle
//!   Fix: Run the training pipeline, then 'yts-core register' to publish the run.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "artifacts",
//!   "message": "model artifacts unavailable: missing supervised_bundle",
//!   "recoverable": true,
//!   "suggested_action": "retrain",
//!   "context": { "missing": ["supervised_bundle"] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Environment or configuration problems.
    Config,
    /// Missing or damaged trained artifacts.
    Artifacts,
    /// Malformed or out-of-range requests.
    Validation,
    /// Drift-check preconditions.
    Drift,
    /// Provenance (manifest/registry/dataset) problems.
    Provenance,
    /// File I/O and serialization errors.
    Io,
    /// Experiment tracking and serving infrastructure.
    Runtime,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Artifacts => write!(f, "artifacts"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Drift => write!(f, "drift"),
            ErrorCategory::Provenance => write!(f, "provenance"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Runtime => write!(f, "runtime"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Run the training pipeline and register the run.
    Retrain,
    /// Correct the request payload and resend.
    FixRequest,
    /// Fix environment variables or flags.
    FixConfig,
    /// Retry the operation.
    Retry,
    /// Abort the operation.
    Abort,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retrain => write!(f, "retrain"),
            SuggestedAction::FixRequest => write!(f, "fix_request"),
            SuggestedAction::FixConfig => write!(f, "fix_config"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for the workspace.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    // Artifact errors (20-29)
    #[error("model artifacts unavailable: missing {}", missing.join(", "))]
    ArtifactsUnavailable { missing: Vec<String> },

    #[error("artifact '{artifact}' is corrupted: {reason}")]
    ArtifactCorrupted { artifact: String, reason: String },

    // Validation errors (30-39)
    #[error("invalid request field '{field}': {message}")]
    Validation { field: String, message: String },

    // Drift errors (40-49)
    #[error("Training baseline missing. Retrain pipeline to enable drift checks.")]
    BaselineMissing,

    // Provenance errors (50-59)
    #[error("failed to hash {}: {source}", path.display())]
    Hashing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset {}:{line}: {message}", path.display())]
    Dataset {
        path: PathBuf,
        line: usize,
        message: String,
    },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Runtime errors (70-79)
    #[error("experiment tracking failed: {0}")]
    Tracking(String),

    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Shorthand for a field-level validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Artifact errors
    /// - 30-39: Validation errors
    /// - 40-49: Drift errors
    /// - 50-59: Provenance errors
    /// - 60-69: I/O errors
    /// - 70-79: Runtime errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSetting { .. } => 11,
            Error::ArtifactsUnavailable { .. } => 20,
            Error::ArtifactCorrupted { .. } => 21,
            Error::Validation { .. } => 30,
            Error::BaselineMissing => 40,
            Error::Hashing { .. } => 50,
            Error::Dataset { .. } => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Tracking(_) => 70,
            Error::Server(_) => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidSetting { .. } => ErrorCategory::Config,
            Error::ArtifactsUnavailable { .. } | Error::ArtifactCorrupted { .. } => {
                ErrorCategory::Artifacts
            }
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::BaselineMissing => ErrorCategory::Drift,
            Error::Hashing { .. } | Error::Dataset { .. } => ErrorCategory::Provenance,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Tracking(_) | Error::Server(_) => ErrorCategory::Runtime,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidSetting { .. } => true,

            // Retraining restores the artifacts.
            Error::ArtifactsUnavailable { .. } => true,
            Error::ArtifactCorrupted { .. } => true,

            Error::Validation { .. } => true,
            Error::BaselineMissing => true,

            // A training run that cannot hash its inputs must abort.
            Error::Hashing { .. } => false,
            Error::Dataset { .. } => false,

            Error::Io(_) => true,
            Error::Json(_) => false,

            Error::Tracking(_) => true,
            Error::Server(_) => false,
        }
    }

    /// Returns the suggested action for automated callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) | Error::InvalidSetting { .. } => SuggestedAction::FixConfig,
            Error::ArtifactsUnavailable { .. } | Error::ArtifactCorrupted { .. } => {
                SuggestedAction::Retrain
            }
            Error::Validation { .. } => SuggestedAction::FixRequest,
            Error::BaselineMissing => SuggestedAction::Retrain,
            Error::Hashing { .. } | Error::Dataset { .. } => SuggestedAction::Abort,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
            Error::Tracking(_) => SuggestedAction::FixConfig,
            Error::Server(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Check YTS_* environment variables and command-line flags.",
            Error::InvalidSetting { .. } => {
                "Correct the named setting; see 'yts-core --help' for accepted ranges."
            }
            Error::ArtifactsUnavailable { .. } => {
                "Run the training pipeline, then 'yts-core register' to publish the run."
            }
            Error::ArtifactCorrupted { .. } => {
                "The bundle failed integrity checks. Retrain to regenerate it."
            }
            Error::Validation { .. } => "Fix the named request field and resend.",
            Error::BaselineMissing => {
                "Run 'yts-core baseline build' or re-register the training run."
            }
            Error::Hashing { .. } => {
                "The dataset or an artifact became unreadable while hashing. Restore it and rerun."
            }
            Error::Dataset { .. } => {
                "The processed dataset must be JSON Lines with one channel object per line."
            }
            Error::Io(_) => "Check disk space, permissions, and that artifact directories exist.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .' or restore from backup.",
            Error::Tracking(_) => {
                "Disable strict tracking (YTS_TRACKING_STRICT=0) or enable a built-in backend."
            }
            Error::Server(_) => "Check that the bind address is free and reachable.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidSetting { .. } => "Invalid Setting",
            Error::ArtifactsUnavailable { .. } => "Model Artifacts Unavailable",
            Error::ArtifactCorrupted { .. } => "Artifact Corrupted",
            Error::Validation { .. } => "Invalid Request",
            Error::BaselineMissing => "Drift Baseline Missing",
            Error::Hashing { .. } => "Hashing Failed",
            Error::Dataset { .. } => "Dataset Parse Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
            Error::Tracking(_) => "Experiment Tracking Error",
            Error::Server(_) => "Server Error",
        }
    }

    /// HTTP status used by the serving boundary.
    ///
    /// Unavailable artifacts and a missing baseline are both 503 but keep
    /// distinct codes so clients can tell them apart.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::ArtifactsUnavailable { .. }
            | Error::ArtifactCorrupted { .. }
            | Error::BaselineMissing => 503,
            Error::Validation { .. } => 422,
            _ => 500,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automated callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (field name, missing artifacts, path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::ArtifactsUnavailable { missing } => {
                context.insert("missing".to_string(), serde_json::json!(missing));
            }
            Error::ArtifactCorrupted { artifact, .. } => {
                context.insert("artifact".to_string(), serde_json::json!(artifact));
            }
            Error::Validation { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::InvalidSetting { name, .. } => {
                context.insert("setting".to_string(), serde_json::json!(name));
            }
            Error::Hashing { path, .. } => {
                context.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            }
            Error::Dataset { path, line, .. } => {
                context.insert("path".to_string(), serde_json::json!(path.display().to_string()));
                context.insert("line".to_string(), serde_json::json!(line));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
