//! Model bundle writer/reader for YouTube success intelligence.
//!
//! A bundle packages one trained model family (supervised regressors or the
//! clustering models) as a single immutable file, produced by the training
//! pipeline and loaded read-only by the service.
//!
//! # Bundle Format
//!
//! Bundles are ZIP archives containing:
//! - `manifest.json`: kind, schema versions, producer, file listing with SHA-256 checksums
//! - JSON members named by the kind (`metadata.json`, `models/<target>.json`,
//!   `scaler.json`, `kmeans.json`, ...)
//!
//! Every member is verified against its manifest checksum before it is
//! deserialized; a mismatch is a hard error, never a warning.
//!
//! # Example
//!
//! ```no_run
//! use yts_bundle::{BundleKind, BundleReader, BundleWriter};
//! use std::path::Path;
//!
//! let mut writer = BundleWriter::new(BundleKind::Clustering)
//!     .with_producer("trainer", "1.4.0");
//! writer.add_json("kmeans.json", &serde_json::json!({"centroids": []})).unwrap();
//! writer.write(Path::new("clustering_bundle.zip")).unwrap();
//!
//! let mut reader = BundleReader::open(Path::new("clustering_bundle.zip")).unwrap();
//! reader.expect_kind(BundleKind::Clustering).unwrap();
//! let kmeans: serde_json::Value = reader.read_json("kmeans.json").unwrap();
//! ```

pub mod error;
pub mod manifest;
pub mod reader;
pub mod writer;

pub use error::{BundleError, Result};
pub use manifest::{BundleKind, BundleManifest, FileEntry, BUNDLE_SCHEMA_VERSION, MANIFEST_FILE_NAME};
pub use reader::BundleReader;
pub use writer::BundleWriter;
