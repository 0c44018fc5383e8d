//! Line source port.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::domain::record::SourceFormat;

/// A source file tagged with the encoding of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// Location of the file.
    pub path: PathBuf,
    /// Encoding of every line in the file.
    pub format: SourceFormat,
}

impl SourceFile {
    /// Create a new source file reference.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

/// Errors from reading sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Source root directory does not exist.
    #[error("source root not found: {}", .0.display())]
    MissingRoot(PathBuf),

    /// Source file does not exist.
    #[error("source file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O failure while listing or reading.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Port for reading raw lines from a source file.
pub trait LineSourcePort: Send + Sync {
    /// Read every line of the source, in order, without line terminators.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened or read.
    fn read_lines(&self, source: &SourceFile) -> Result<Vec<String>, SourceError>;

    /// Get the name of this source.
    fn name(&self) -> &'static str;
}

/// In-memory line source for testing.
#[derive(Debug, Default)]
pub struct InMemoryLineSource {
    files: RwLock<HashMap<PathBuf, Vec<String>>>,
}

impl InMemoryLineSource {
    /// Create a new empty in-memory source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the lines of a file.
    pub fn add_file(&self, path: impl AsRef<Path>, lines: &[&str]) {
        self.files.write().insert(
            path.as_ref().to_path_buf(),
            lines.iter().map(|l| (*l).to_string()).collect(),
        );
    }
}

impl LineSourcePort for InMemoryLineSource {
    fn read_lines(&self, source: &SourceFile) -> Result<Vec<String>, SourceError> {
        self.files
            .read()
            .get(&source.path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(source.path.clone()))
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_returns_registered_lines() {
        let source = InMemoryLineSource::new();
        source.add_file("a.csv", &["one", "two"]);

        let lines = source
            .read_lines(&SourceFile::new("a.csv", SourceFormat::PositionalCsv))
            .unwrap();

        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn in_memory_unknown_file_is_not_found() {
        let source = InMemoryLineSource::new();
        let err = source
            .read_lines(&SourceFile::new("missing.json", SourceFormat::KeyValueJson))
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound(_)));
        assert!(err.to_string().contains("missing.json"));
    }
}
