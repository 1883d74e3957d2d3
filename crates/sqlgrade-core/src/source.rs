//! SQL source files

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// A SQL file's path and text. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Read a file from disk, refusing files above `max_bytes` and non-UTF-8 content
    pub fn read(path: &Path, max_bytes: usize) -> Result<Self, SourceError> {
        let metadata = fs::metadata(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > max_bytes as u64 {
            return Err(SourceError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: max_bytes,
            });
        }

        let bytes = fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| SourceError::NotUtf8 {
            path: path.to_path_buf(),
            offset: e.utf8_error().valid_up_to(),
        })?;

        Ok(Self::new(path, text))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
