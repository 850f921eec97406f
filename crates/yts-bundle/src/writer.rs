//! Bundle writer.
//!
//! Creates ZIP archives with a checksummed manifest. File output goes to a
//! temporary sibling first and is renamed into place, so a reader never
//! observes a half-written bundle.

use crate::{BundleError, BundleKind, BundleManifest, FileEntry, Result, MANIFEST_FILE_NAME};
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Builder for model bundles.
pub struct BundleWriter {
    manifest: BundleManifest,
    files: Vec<(String, Vec<u8>)>,
}

impl BundleWriter {
    /// Create a new bundle writer for a model family.
    pub fn new(kind: BundleKind) -> Self {
        Self {
            manifest: BundleManifest::new(kind),
            files: Vec::new(),
        }
    }

    /// Record the training run.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.manifest = self.manifest.with_run_id(run_id);
        self
    }

    /// Record the producing tool and version.
    pub fn with_producer(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.manifest = self.manifest.with_producer(name, version);
        self
    }

    /// Set the bundle description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.manifest = self.manifest.with_description(description);
        self
    }

    /// Add raw bytes with automatic checksum. Re-adding a path replaces it.
    pub fn add_bytes(&mut self, path: impl Into<String>, data: Vec<u8>) {
        let path = path.into();
        self.manifest.files.retain(|f| f.path != path);
        self.files.retain(|(p, _)| *p != path);

        let entry = FileEntry::for_data(&path, &data);
        debug!(path = %entry.path, bytes = entry.bytes, "Added file to bundle");
        self.manifest.add_file(entry);
        self.files.push((path, data));
    }

    /// Add a JSON-serializable value as a file.
    pub fn add_json<T: serde::Serialize>(&mut self, path: impl Into<String>, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        self.add_bytes(path, json);
        Ok(())
    }

    /// Get the current manifest (for inspection before writing).
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Get total size in bytes before compression.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|(_, data)| data.len() as u64).sum()
    }

    /// Get file count (not including manifest).
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn finish_into<W: Write + Seek>(&mut self, sink: W) -> Result<()> {
        if self.files.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        // Sort files for deterministic ordering
        self.manifest.sort_files();
        self.files.sort_by(|a, b| a.0.cmp(&b.0));

        let manifest_json = self.manifest.to_json()?;

        let mut zip = ZipWriter::new(sink);
        let options: FileOptions<'_, ()> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        // Manifest first, so streaming readers see it before any member.
        zip.start_file(MANIFEST_FILE_NAME, options)?;
        zip.write_all(manifest_json.as_bytes())?;

        for (file_path, data) in &self.files {
            zip.start_file(file_path.as_str(), options)?;
            zip.write_all(data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write the bundle to a file via a temporary sibling and rename.
    pub fn write(mut self, path: &Path) -> Result<BundleManifest> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("bundle.zip");
        let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));

        let result = File::create(&tmp_path)
            .map_err(BundleError::from)
            .and_then(|file| self.finish_into(file));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        std::fs::rename(&tmp_path, path)?;

        info!(
            path = %path.display(),
            kind = %self.manifest.kind,
            files = self.files.len(),
            bytes = self.total_bytes(),
            "Bundle written"
        );

        Ok(self.manifest)
    }

    /// Write the bundle to a byte vector (for in-memory use).
    pub fn write_to_vec(mut self) -> Result<(Vec<u8>, BundleManifest)> {
        let mut buffer = Cursor::new(Vec::new());
        self.finish_into(&mut buffer)?;
        let bytes = buffer.into_inner();

        info!(
            kind = %self.manifest.kind,
            files = self.files.len(),
            compressed_bytes = bytes.len(),
            uncompressed_bytes = self.total_bytes(),
            "Bundle written to memory"
        );

        Ok((bytes, self.manifest))
    }
}
