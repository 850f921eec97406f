//! Filesystem helpers shared by every artifact writer.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use yts_common::Result;

fn tmp_sibling(path: &Path, fallback: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(fallback);
    path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `value` as pretty JSON via a temporary sibling and rename.
pub fn write_json_pretty_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_vec_pretty(value)?;
    let tmp_path = tmp_sibling(path, "document.json");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&content)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write one JSON object per line via a temporary sibling and rename.
pub fn write_jsonl_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let tmp_path = tmp_sibling(path, "table.jsonl");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read a JSON document, returning `None` when the file does not exist.
pub fn read_json_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_json_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("doc.json");
        write_json_pretty_atomic(&path, &serde_json::json!({"ok": true})).unwrap();

        let back: serde_json::Value = read_json_optional(&path).unwrap().unwrap();
        assert_eq!(back["ok"], true);
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_jsonl_one_row_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.jsonl");
        write_jsonl_atomic(&path, &[serde_json::json!({"i": 0}), serde_json::json!({"i": 1})])
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<serde_json::Value> =
            read_json_optional(&dir.path().join("absent.json")).unwrap();
        assert!(value.is_none());
    }
}
