//! Error-code and status stability tests.
//!
//! Codes and HTTP statuses are consumed by clients and scripts, so changing
//! one is a breaking change.

use yts_common::error::{ErrorCategory, StructuredError};
use yts_common::Error;

#[test]
fn codes_are_stable() {
    let cases: Vec<(Error, u32, u16)> = vec![
        (Error::Config("x".into()), 10, 500),
        (
            Error::ArtifactsUnavailable {
                missing: vec!["supervised_bundle".into()],
            },
            20,
            503,
        ),
        (
            Error::ArtifactCorrupted {
                artifact: "clustering_bundle".into(),
                reason: "checksum".into(),
            },
            21,
            503,
        ),
        (Error::validation("top_n", "must be in 1..=50"), 30, 422),
        (Error::BaselineMissing, 40, 503),
        (Error::Tracking("mlflow".into()), 70, 500),
    ];

    for (err, code, status) in cases {
        assert_eq!(err.code(), code, "{err}");
        assert_eq!(err.http_status(), status, "{err}");
    }
}

#[test]
fn structured_error_serializes_category() {
    let err = Error::ArtifactsUnavailable {
        missing: vec!["training_baseline".into(), "training_manifest".into()],
    };
    let structured = StructuredError::from(&err);
    assert_eq!(structured.category, ErrorCategory::Artifacts);

    let value: serde_json::Value = serde_json::from_str(&structured.to_json()).unwrap();
    assert_eq!(value["category"], "artifacts");
    assert_eq!(value["context"]["missing"][1], "training_manifest");
}
