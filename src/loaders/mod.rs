pub mod pdf;

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::Config;

/// A supported document found in the source directory.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// The configured document directory does not exist. Distinct from an
    /// empty directory so callers can tell "no documents" from a
    /// misconfigured path.
    #[error("document directory not found: {0}")]
    DirectoryMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct SaveReport {
    pub saved: Vec<String>,
    pub failed: Vec<SaveFailure>,
}

#[derive(Debug, Serialize)]
pub struct SaveFailure {
    pub name: String,
    pub error: String,
}

/// Writes each uploaded `(filename, bytes)` pair verbatim under `dir`,
/// overwriting existing files. Files are written independently; one
/// failure does not block the rest.
pub fn save_uploads(uploads: &[(String, Vec<u8>)], dir: &Path) -> SaveReport {
    let mut report = SaveReport::default();

    for (name, bytes) in uploads {
        let target = dir.join(name);

        let result = (|| {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, bytes)
        })();

        match result {
            Ok(()) => {
                tracing::info!("Saved upload: {} ({} bytes)", name, bytes.len());
                report.saved.push(name.clone());
            }
            Err(e) => {
                tracing::error!("Failed to save upload {}: {}", name, e);
                report.failed.push(SaveFailure {
                    name: name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

/// Recursively lists supported files under `dir` with their byte sizes.
pub fn scan_directory(config: &Config, dir: &Path) -> Result<Vec<DocumentEntry>, ScanError> {
    if !dir.exists() {
        return Err(ScanError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !config.is_supported_file(path) {
            continue;
        }

        let size = entry.metadata().map_err(std::io::Error::from)?.len();

        entries.push(DocumentEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: path.to_path_buf(),
            size,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_upload_shows_up_in_scan_with_exact_size() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::default();
        let payload = b"not really a pdf, but intake does not care".to_vec();

        let report = save_uploads(&[("doc1.pdf".to_string(), payload.clone())], tmp.path());
        assert_eq!(report.saved, vec!["doc1.pdf"]);
        assert!(report.failed.is_empty());

        let entries = scan_directory(&config, tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "doc1.pdf");
        assert_eq!(entries[0].size, payload.len() as u64);
    }

    #[test]
    fn save_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();

        save_uploads(&[("doc.txt".to_string(), b"first".to_vec())], tmp.path());
        save_uploads(&[("doc.txt".to_string(), b"second and longer".to_vec())], tmp.path());

        let content = std::fs::read(tmp.path().join("doc.txt")).unwrap();
        assert_eq!(content, b"second and longer");
    }

    #[test]
    fn scan_recurses_and_filters_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::default();

        std::fs::create_dir_all(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/report.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.csv"), b"a,b").unwrap();
        std::fs::write(tmp.path().join("binary.bin"), b"\x00").unwrap();

        let mut names: Vec<String> = scan_directory(&config, tmp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();

        assert_eq!(names, vec!["notes.csv", "report.PDF"]);
    }

    #[test]
    fn missing_directory_is_a_distinct_condition() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::default();

        let err = scan_directory(&config, &tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ScanError::DirectoryMissing(_)));
    }
}
