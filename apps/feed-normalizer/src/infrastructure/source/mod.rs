//! Filesystem Line Source
//!
//! Discovers source files under a root directory and reads their lines.
//!
//! Discovery walks the tree recursively and returns files in path order so
//! runs are reproducible. Entries whose name contains `.DS` (Finder
//! metadata such as `.DS_Store`) are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::application::ports::{LineSourcePort, SourceError, SourceFile};
use crate::domain::record::SourceFormat;

/// Path fragment marking metadata files to skip.
const IGNORED_FRAGMENT: &str = ".DS";

/// Reads source files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLineSource;

impl FileLineSource {
    /// Create a new filesystem source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LineSourcePort for FileLineSource {
    fn read_lines(&self, source: &SourceFile) -> Result<Vec<String>, SourceError> {
        let file = File::open(&source.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(source.path.clone()),
            _ => io_error(&source.path, e),
        })?;

        let mut lines = Vec::new();
        let mut lossy = 0_usize;
        for chunk in BufReader::new(file).split(b'\n') {
            let mut bytes = chunk.map_err(|e| io_error(&source.path, e))?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    lossy += 1;
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            lines.push(line);
        }

        if lossy > 0 {
            warn!(
                path = %source.path.display(),
                lines = lossy,
                "Replaced invalid UTF-8 in source lines"
            );
        }
        Ok(lines)
    }

    fn name(&self) -> &'static str {
        "Filesystem"
    }
}

/// List every file under `root` as a source of the given format.
///
/// An existing but empty root yields no sources.
///
/// # Errors
///
/// Returns [`SourceError::MissingRoot`] if `root` is not a directory, or an
/// I/O error if a directory cannot be listed.
pub fn discover_sources(root: &Path, format: SourceFormat) -> Result<Vec<SourceFile>, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::MissingRoot(root.to_path_buf()));
    }

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if entry.file_type().is_file() {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    debug!(
        root = %root.display(),
        format = %format,
        files = paths.len(),
        "Discovered source files"
    );

    Ok(paths
        .into_iter()
        .map(|path| SourceFile::new(path, format))
        .collect())
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().contains(IGNORED_FRAGMENT)
}

fn walk_error(root: &Path, err: walkdir::Error) -> SourceError {
    let path = err.path().unwrap_or(root).to_path_buf();
    SourceError::Io {
        path,
        source: err.into(),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// =============================================================================
// Tests
// =============================================================================
