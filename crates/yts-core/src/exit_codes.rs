//! Exit codes for the yts-core CLI.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

use yts_common::Error;

/// Exit codes for yts-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-1)
    // ========================================================================
    /// Success
    Ok = 0,

    /// Command ran, but required artifacts are missing (readiness probe)
    NotReady = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or configuration
    ArgsError = 10,

    /// Model artifacts missing or corrupted
    ArtifactsError = 11,

    /// Request payload failed validation
    ValidationError = 12,

    /// Drift check requested without a training baseline
    BaselineError = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// User/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::NotReady => "NOT_READY",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ArtifactsError => "ERR_ARTIFACTS",
            ExitCode::ValidationError => "ERR_VALIDATION",
            ExitCode::BaselineError => "ERR_BASELINE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidSetting { .. } => ExitCode::ArgsError,
            Error::ArtifactsUnavailable { .. } | Error::ArtifactCorrupted { .. } => {
                ExitCode::ArtifactsError
            }
            Error::Validation { .. } => ExitCode::ValidationError,
            Error::BaselineMissing => ExitCode::BaselineError,
            Error::Hashing { .. } | Error::Dataset { .. } | Error::Io(_) => ExitCode::IoError,
            Error::Json(_) | Error::Tracking(_) | Error::Server(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Ok.is_success());
        assert!(!ExitCode::NotReady.is_success());
        assert!(!ExitCode::NotReady.is_user_error());
        assert!(ExitCode::ValidationError.is_user_error());
        assert!(ExitCode::IoError.is_internal_error());
        assert!(!ExitCode::BaselineError.is_internal_error());
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::from(&Error::validation("age", "must be <= 100")),
            ExitCode::ValidationError
        );
        assert_eq!(
            ExitCode::from(&Error::ArtifactsUnavailable {
                missing: vec!["supervised_bundle".into()]
            }),
            ExitCode::ArtifactsError
        );
        assert_eq!(ExitCode::from(&Error::BaselineMissing), ExitCode::BaselineError);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::NotReady.to_string(), "NOT_READY (1)");
        assert_eq!(i32::from(ExitCode::IoError), 21);
    }
}
