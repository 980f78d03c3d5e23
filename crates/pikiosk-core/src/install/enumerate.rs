//! Source enumeration of descriptor files.

use crate::error::{KioskError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A descriptor file found in the source directory.
///
/// Source files are never modified; only installed copies are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorFile {
    /// Unique key within the source directory.
    pub file_name: String,
    pub source_path: PathBuf,
}

impl DescriptorFile {
    /// Where this descriptor lands inside `target_dir`.
    pub fn installed_path(&self, target_dir: &Path) -> PathBuf {
        target_dir.join(&self.file_name)
    }
}

/// List regular files with `extension` directly inside `dir`, sorted by name.
///
/// An empty result is not an error. A missing directory is `SourceMissing`.
pub fn enumerate_descriptors(dir: &Path, extension: &str) -> Result<Vec<DescriptorFile>> {
    if !dir.is_dir() {
        return Err(KioskError::SourceMissing(dir.to_path_buf()));
    }

    let mut descriptors = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| KioskError::Io {
            message: e.to_string(),
            path: e.path().map(Path::to_path_buf),
            source: e.into_io_error(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        descriptors.push(DescriptorFile {
            file_name: entry.file_name().to_string_lossy().into_owned(),
            source_path: path.to_path_buf(),
        });
    }

    Ok(descriptors)
}
