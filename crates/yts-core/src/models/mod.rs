//! Adapters over the trained model bundles.
//!
//! Both bundle families are written by the external training pipeline with
//! `yts-bundle` and loaded read-only here. Loading verifies every member
//! checksum and the structural invariants of the models before the bundle
//! is handed to the service.

pub mod clustering;
pub mod encoder;
pub mod forest;
pub mod supervised;

pub use clustering::{
    ClusterAssignment, ClusterProfile, ClusterTrainingRow, ClusteringBundle, DbscanModel,
    KMeansModel, StandardScaler, CLUSTER_FEATURES,
};
pub use encoder::{FeatureEncoder, SupervisedMetadata};
pub use forest::{DecisionTree, Forest, TreeNode};
pub use supervised::{FeatureImportance, Prediction, PredictionBundle, TargetMetrics};

use std::path::Path;
use yts_bundle::{BundleError, BundleKind, BundleReader};
use yts_common::Error;

/// Map a bundle-layer failure onto the service error taxonomy.
///
/// A file that does not exist is "unavailable"; anything else that goes
/// wrong with an existing file means the artifact is corrupted.
pub(crate) fn bundle_error(artifact: &str, err: BundleError) -> Error {
    match err {
        BundleError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
            Error::ArtifactsUnavailable {
                missing: vec![artifact.to_string()],
            }
        }
        other => Error::ArtifactCorrupted {
            artifact: artifact.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Open a bundle and check its family.
pub(crate) fn open_bundle(
    path: &Path,
    artifact: &str,
    kind: BundleKind,
) -> Result<BundleReader<std::fs::File>, Error> {
    if !path.exists() {
        return Err(Error::ArtifactsUnavailable {
            missing: vec![artifact.to_string()],
        });
    }
    let reader = BundleReader::open(path).map_err(|e| bundle_error(artifact, e))?;
    reader
        .expect_kind(kind)
        .map_err(|e| bundle_error(artifact, e))?;
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        match bundle_error("clustering_bundle", BundleError::Io(io)) {
            Error::ArtifactsUnavailable { missing } => {
                assert_eq!(missing, vec!["clustering_bundle".to_string()])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_checksum_maps_to_corrupted() {
        let err = bundle_error(
            "supervised_bundle",
            BundleError::ChecksumMismatch {
                path: "metadata.json".into(),
                expected: "a".into(),
                actual: "b".into(),
            },
        );
        assert!(matches!(err, Error::ArtifactCorrupted { .. }));
        assert_eq!(err.http_status(), 503);
    }
}
