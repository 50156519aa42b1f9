//! Storage layer for docseek
//!
//! On-disk layout under the data directory:
//! - `metadata.db`: documents and chunks
//! - `vectors/vectors.bin`, `vectors/vectors.json`: the vector index and its
//!   per-slot records

pub mod metadata;

use crate::error::{DocseekError, Result};
use std::path::{Path, PathBuf};

pub use metadata::{Chunk, DbPool, Document, MetadataBlob, MetadataStore, NewDocument};

/// Paths of the persisted index artifacts
#[derive(Debug, Clone)]
pub struct StorageLayout {
    base_path: PathBuf,
}

impl StorageLayout {
    /// Create the layout, making sure its directories exist
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let layout = Self { base_path };
        let vectors = layout.vectors_dir();
        std::fs::create_dir_all(&vectors).map_err(|e| {
            DocseekError::io(
                e,
                format!("Failed to create vectors directory: {}", vectors.display()),
            )
        })?;
        Ok(layout)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn metadata_db_path(&self) -> PathBuf {
        self.base_path.join("metadata.db")
    }

    pub fn vectors_dir(&self) -> PathBuf {
        self.base_path.join("vectors")
    }

    /// Total bytes under the data directory
    pub fn total_size(&self) -> Result<u64> {
        dir_size(&self.base_path)
    }

    /// Format size as human-readable string
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> Result<u64> {
    let mut size = 0u64;

    if path.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|e| {
            DocseekError::io(
                e,
                format!(
                    "Failed to read directory for size calculation: {}",
                    path.display()
                ),
            )
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                DocseekError::io(e, "Failed to read directory entry for size calculation")
            })?;
            let path = entry.path();

            if path.is_dir() {
                size += dir_size(&path)?;
            } else {
                size += entry
                    .metadata()
                    .map_err(|e| {
                        DocseekError::io(
                            e,
                            format!("Failed to get file metadata: {}", path.display()),
                        )
                    })?
                    .len();
            }
        }
    }

    Ok(size)
}
