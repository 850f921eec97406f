//! Bundle manifest types and serialization.
//!
//! The manifest is the source of truth for a bundle's contents:
//! - which model family the bundle holds
//! - which tool/version produced it, and for which training run
//! - every member file with its SHA-256 checksum and size

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current bundle schema version.
pub const BUNDLE_SCHEMA_VERSION: &str = "1.0.0";

/// Manifest file name within the bundle.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Model family stored in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    /// Three target regressors plus encoder metadata and metrics.
    Supervised,
    /// Scaler, partitioning and density models, profiles and archetypes.
    Clustering,
}

impl std::fmt::Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleKind::Supervised => write!(f, "supervised"),
            BundleKind::Clustering => write!(f, "clustering"),
        }
    }
}

/// Bundle manifest containing metadata and file checksums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Bundle format version.
    pub bundle_version: String,

    /// Schema version of the member documents.
    pub schema_version: String,

    /// Model family.
    pub kind: BundleKind,

    /// When the bundle was created.
    pub created_at: DateTime<Utc>,

    /// Training run that produced the bundle, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Name of the producing tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Version of the producing tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_version: Option<String>,

    /// Files included in the bundle with checksums.
    pub files: Vec<FileEntry>,

    /// Optional description or notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BundleManifest {
    /// Create a new manifest for a model family.
    pub fn new(kind: BundleKind) -> Self {
        Self {
            bundle_version: BUNDLE_SCHEMA_VERSION.to_string(),
            schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
            kind,
            created_at: Utc::now(),
            run_id: None,
            producer: None,
            producer_version: None,
            files: Vec::new(),
            description: None,
        }
    }

    /// Record the training run.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Record the producing tool and version.
    pub fn with_producer(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.producer = Some(name.into());
        self.producer_version = Some(version.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a file entry to the manifest.
    pub fn add_file(&mut self, entry: FileEntry) {
        self.files.push(entry);
    }

    /// Get total size of all files in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }

    /// Get file count.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Find a file by path.
    pub fn find_file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Validate the manifest structure.
    pub fn validate(&self) -> crate::Result<()> {
        if self.bundle_version != BUNDLE_SCHEMA_VERSION {
            return Err(crate::BundleError::UnsupportedVersion {
                version: self.bundle_version.clone(),
                supported: BUNDLE_SCHEMA_VERSION.to_string(),
            });
        }

        if self.files.is_empty() {
            return Err(crate::BundleError::CorruptedManifest(
                "manifest lists no files".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for file in &self.files {
            if file.path.is_empty() {
                return Err(crate::BundleError::CorruptedManifest(
                    "file entry has empty path".to_string(),
                ));
            }
            if file.path == MANIFEST_FILE_NAME {
                return Err(crate::BundleError::CorruptedManifest(
                    "manifest lists itself".to_string(),
                ));
            }
            if !seen.insert(file.path.as_str()) {
                return Err(crate::BundleError::CorruptedManifest(format!(
                    "duplicate file entry '{}'",
                    file.path
                )));
            }
            if file.sha256.len() != 64 || !file.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(crate::BundleError::CorruptedManifest(format!(
                    "file '{}' has invalid checksum",
                    file.path
                )));
            }
        }

        Ok(())
    }

    /// Sort files for deterministic ordering.
    pub fn sort_files(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Serialize to JSON with consistent formatting.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// File entry in the manifest with checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path within the bundle (relative).
    pub path: String,

    /// SHA-256 checksum (64 hex characters).
    pub sha256: String,

    /// Size in bytes.
    pub bytes: u64,
}

impl FileEntry {
    /// Create an entry for `data`, computing its checksum.
    pub fn for_data(path: impl Into<String>, data: &[u8]) -> Self {
        Self {
            path: path.into(),
            sha256: Self::compute_checksum(data),
            bytes: data.len() as u64,
        }
    }

    /// Compute SHA-256 checksum of data.
    pub fn compute_checksum(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Verify the checksum against data.
    pub fn verify(&self, data: &[u8]) -> bool {
        data.len() as u64 == self.bytes && Self::compute_checksum(data) == self.sha256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, fill: char) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            sha256: fill.to_string().repeat(64),
            bytes: 10,
        }
    }

    #[test]
    fn test_manifest_builder() {
        let manifest = BundleManifest::new(BundleKind::Supervised)
            .with_run_id("20260101T000000Z-deadbeef")
            .with_producer("trainer", "2.0.0")
            .with_description("nightly");

        assert_eq!(manifest.kind, BundleKind::Supervised);
        assert_eq!(manifest.run_id.as_deref(), Some("20260101T000000Z-deadbeef"));
        assert_eq!(manifest.producer_version.as_deref(), Some("2.0.0"));
        assert_eq!(manifest.bundle_version, BUNDLE_SCHEMA_VERSION);
    }

    #[test]
    fn test_validate_requires_files() {
        let manifest = BundleManifest::new(BundleKind::Clustering);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut manifest = BundleManifest::new(BundleKind::Clustering);
        manifest.add_file(entry("kmeans.json", 'a'));
        manifest.add_file(entry("kmeans.json", 'b'));
        assert!(matches!(
            manifest.validate(),
            Err(crate::BundleError::CorruptedManifest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        let mut manifest = BundleManifest::new(BundleKind::Clustering);
        manifest.add_file(FileEntry {
            path: "scaler.json".into(),
            sha256: "z".repeat(64),
            bytes: 1,
        });
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_future_version() {
        let mut manifest = BundleManifest::new(BundleKind::Supervised);
        manifest.add_file(entry("metadata.json", 'a'));
        manifest.bundle_version = "9.0.0".into();
        assert!(matches!(
            manifest.validate(),
            Err(crate::BundleError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_sort_and_totals() {
        let mut manifest = BundleManifest::new(BundleKind::Supervised);
        manifest.add_file(entry("models/growth.json", 'a'));
        manifest.add_file(entry("metadata.json", 'b'));
        manifest.sort_files();
        assert_eq!(manifest.files[0].path, "metadata.json");
        assert_eq!(manifest.total_bytes(), 20);
        assert!(manifest.find_file("models/growth.json").is_some());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&BundleKind::Clustering).unwrap();
        assert_eq!(json, "\"clustering\"");
    }

    #[test]
    fn test_file_entry_verify() {
        let data = b"{\"k\":4}";
        let entry = FileEntry::for_data("kmeans.json", data);
        assert!(entry.verify(data));
        assert!(!entry.verify(b"{\"k\":5}"));
    }
}
