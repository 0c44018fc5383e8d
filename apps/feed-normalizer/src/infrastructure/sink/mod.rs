//! Partitioned JSON Lines Sink
//!
//! Writes normalized records under a Hive-style directory tree:
//!
//! ```text
//! <root>/
//!   partition=T/part-00000.jsonl
//!   partition=Q/part-00000.jsonl
//!   partition=B/part-00000.jsonl
//! ```
//!
//! Each line is one record serialized with all fourteen columns, nulls
//! included. Every run is a full refresh staged in a sibling directory
//! (`<root>.staging`). `finish` swaps it into place, moving the previous
//! output aside to `<root>.previous` until the swap succeeds; `abort`
//! deletes the staging directory and leaves the previous output as it was.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::application::ports::{RecordSinkPort, SinkError};
use crate::domain::partition::PartitionLayout;
use crate::domain::record::CanonicalRecord;

/// File name of the single data file in each partition directory.
pub const PART_FILE_NAME: &str = "part-00000.jsonl";

const STAGING_SUFFIX: &str = ".staging";
const PREVIOUS_SUFFIX: &str = ".previous";

#[derive(Debug, Default)]
struct SinkState {
    open: bool,
    writers: BTreeMap<String, BufWriter<File>>,
}

/// Writes one JSON Lines file per partition key.
#[derive(Debug)]
pub struct PartitionedJsonSink {
    root: PathBuf,
    layout: PartitionLayout,
    state: Mutex<SinkState>,
}

impl PartitionedJsonSink {
    /// Create a sink rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, layout: PartitionLayout) -> Self {
        Self {
            root: root.into(),
            layout,
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Output root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the published data file for a partition key.
    #[must_use]
    pub fn part_path(&self, key: &str) -> PathBuf {
        self.root.join(self.layout.directory(key)).join(PART_FILE_NAME)
    }

    /// Directory the current run writes into.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidRoot`] if the root has no final component.
    pub fn staging_root(&self) -> Result<PathBuf, SinkError> {
        sibling(&self.root, STAGING_SUFFIX)
    }

    fn staged_path(&self, key: &str) -> Result<PathBuf, SinkError> {
        Ok(self
            .staging_root()?
            .join(self.layout.directory(key))
            .join(PART_FILE_NAME))
    }

    fn open_writer(&self, key: &str) -> Result<BufWriter<File>, SinkError> {
        let path = self.staged_path(key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        }
        let file = File::create(&path).map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), "Opened partition file");
        Ok(BufWriter::new(file))
    }

    fn publish(&self) -> Result<(), SinkError> {
        let staging = self.staging_root()?;
        let previous = sibling(&self.root, PREVIOUS_SUFFIX)?;

        remove_if_present(&previous)?;
        if self.root.exists() {
            fs::rename(&self.root, &previous).map_err(|e| io_error(&self.root, e))?;
        }
        if let Err(e) = fs::rename(&staging, &self.root) {
            if previous.exists()
                && let Err(restore) = fs::rename(&previous, &self.root)
            {
                warn!(
                    previous = %previous.display(),
                    error = %restore,
                    "Failed to restore previous output"
                );
            }
            return Err(io_error(&self.root, e));
        }
        remove_if_present(&previous)?;

        info!(root = %self.root.display(), "Output published");
        Ok(())
    }
}

impl RecordSinkPort for PartitionedJsonSink {
    fn begin(&self) -> Result<(), SinkError> {
        let staging = self.staging_root()?;
        let mut state = self.state.lock();
        state.writers.clear();

        remove_if_present(&staging)?;
        fs::create_dir_all(&staging).map_err(|e| io_error(&staging, e))?;

        state.open = true;
        drop(state);

        info!(
            root = %self.root.display(),
            staging = %staging.display(),
            "Staging output"
        );
        Ok(())
    }

    fn write_partition(&self, key: &str, records: &[CanonicalRecord]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(SinkError::NotOpen);
        }

        if !state.writers.contains_key(key) {
            let writer = self.open_writer(key)?;
            state.writers.insert(key.to_string(), writer);
        }
        let Some(writer) = state.writers.get_mut(key) else {
            return Err(SinkError::NotOpen);
        };

        for record in records {
            serde_json::to_writer(&mut *writer, record)?;
            writer
                .write_all(b"\n")
                .map_err(|e| io_error(&self.part_path(key), e))?;
        }
        drop(state);

        Ok(())
    }

    fn finish(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(SinkError::NotOpen);
        }
        state.open = false;
        let writers = std::mem::take(&mut state.writers);
        drop(state);

        for (key, mut writer) in writers {
            writer.flush().map_err(|e| io_error(&self.part_path(&key), e))?;
        }
        self.publish()
    }

    fn abort(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.open = false;
        state.writers.clear();
        drop(state);

        let staging = self.staging_root()?;
        remove_if_present(&staging)?;

        warn!(root = %self.root.display(), "Discarded staged output");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "PartitionedJson"
    }
}

fn sibling(root: &Path, suffix: &str) -> Result<PathBuf, SinkError> {
    let Some(name) = root.file_name() else {
        return Err(SinkError::InvalidRoot(root.to_path_buf()));
    };
    let mut name = name.to_os_string();
    name.push(suffix);
    Ok(root.with_file_name(name))
}

fn remove_if_present(dir: &Path) -> Result<(), SinkError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// =============================================================================
// Tests
// =============================================================================
