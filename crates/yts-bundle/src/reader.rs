//! Bundle reader with integrity verification.

use crate::{BundleError, BundleKind, BundleManifest, FileEntry, Result, MANIFEST_FILE_NAME};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Reader for model bundles.
pub struct BundleReader<R: Read + Seek> {
    manifest: BundleManifest,
    archive: ZipArchive<R>,
    verified: HashSet<String>,
}

impl BundleReader<File> {
    /// Open a bundle from a file path.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl BundleReader<Cursor<Vec<u8>>> {
    /// Open a bundle from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> BundleReader<R> {
    /// Create a reader from any Read + Seek source. The manifest is parsed and
    /// structurally validated; member checksums are checked lazily on read.
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let manifest = Self::read_manifest(&mut archive)?;
        manifest.validate()?;

        info!(
            kind = %manifest.kind,
            run_id = manifest.run_id.as_deref().unwrap_or("-"),
            files = manifest.file_count(),
            "Bundle opened"
        );

        Ok(Self {
            manifest,
            archive,
            verified: HashSet::new(),
        })
    }

    fn read_manifest(archive: &mut ZipArchive<R>) -> Result<BundleManifest> {
        let mut manifest_file = archive
            .by_name(MANIFEST_FILE_NAME)
            .map_err(|_| BundleError::MissingFile(MANIFEST_FILE_NAME.to_string()))?;

        let mut json = String::new();
        manifest_file.read_to_string(&mut json)?;

        BundleManifest::from_json(&json)
            .map_err(|e| BundleError::CorruptedManifest(e.to_string()))
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Model family held by the bundle.
    pub fn kind(&self) -> BundleKind {
        self.manifest.kind
    }

    /// Fail unless the bundle holds the expected model family.
    pub fn expect_kind(&self, expected: BundleKind) -> Result<()> {
        if self.manifest.kind != expected {
            return Err(BundleError::KindMismatch {
                expected: expected.to_string(),
                actual: self.manifest.kind.to_string(),
            });
        }
        Ok(())
    }

    /// List all files in the bundle.
    pub fn files(&self) -> &[FileEntry] {
        &self.manifest.files
    }

    /// Check if a file exists in the bundle.
    pub fn has_file(&self, path: &str) -> bool {
        self.manifest.find_file(path).is_some()
    }

    /// Read a member without verification.
    ///
    /// Use `read_verified` for integrity-checked reads.
    pub fn read_raw(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| BundleError::FileNotFound(path.to_string()))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        debug!(path, bytes = data.len(), "Read file from bundle (unverified)");
        Ok(data)
    }

    /// Read a member and check it against the manifest checksum.
    pub fn read_verified(&mut self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .manifest
            .find_file(path)
            .ok_or_else(|| BundleError::FileNotFound(path.to_string()))?
            .clone();

        let data = self.read_raw(path)?;

        let actual = FileEntry::compute_checksum(&data);
        if actual != entry.sha256 {
            return Err(BundleError::ChecksumMismatch {
                path: path.to_string(),
                expected: entry.sha256,
                actual,
            });
        }

        self.verified.insert(path.to_string());
        debug!(path, "File verified");
        Ok(data)
    }

    /// Check if a member has been verified.
    pub fn is_verified(&self, path: &str) -> bool {
        self.verified.contains(path)
    }

    /// Verify all members. Returns the paths that failed.
    pub fn verify_all(&mut self) -> Vec<String> {
        let paths: Vec<String> = self.manifest.files.iter().map(|f| f.path.clone()).collect();
        let mut failures = Vec::new();

        for path in paths {
            if let Err(e) = self.read_verified(&path) {
                warn!(path = %path, error = %e, "Verification failed");
                failures.push(path);
            }
        }

        if failures.is_empty() {
            info!(kind = %self.manifest.kind, "All bundle files verified");
        }
        failures
    }

    /// Read and parse a verified JSON member.
    pub fn read_json<T: serde::de::DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let data = self.read_verified(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}
