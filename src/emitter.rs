//! Log Emitter - one JSON file per finished run
//!
//! Files are named `execution_<task_id>_<YYYYmmdd_HHMMSS_mmm>_<seq>.json`.
//! The task id separates concurrent executors, the millisecond timestamp
//! orders records, and the process-wide sequence number keeps two runs
//! finishing in the same millisecond apart. Files are created with
//! `create_new`, so an existing record is never overwritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::info;

use crate::config::sanitize_tag;
use crate::record::RunRecord;
use crate::Result;

/// Filename prefix of persisted run records.
pub const RECORD_PREFIX: &str = "execution_";

/// Default glob matching persisted run records.
pub const RECORD_PATTERN: &str = "execution_*.json";

static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes run records into an output directory.
#[derive(Debug, Clone)]
pub struct LogEmitter {
    output_dir: PathBuf,
}

impl LogEmitter {
    /// Create an emitter for `output_dir` (created lazily on first emit).
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Directory records are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist `record` and return the path it was written to.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the record
    /// cannot be written.
    pub fn emit(&self, record: &RunRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let (path, file) = self.create_unique(record.task_id())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.flush()?;

        info!(
            event_type = "test_execution_complete",
            test_name = record.test_name(),
            task_id = record.task_id(),
            total_time = record.total_execution_time(),
            checkpoint_count = record.checkpoint_count(),
            path = %path.display(),
            "run record saved"
        );

        Ok(path)
    }

    fn create_unique(&self, task_id: &str) -> Result<(PathBuf, File)> {
        let task_id = sanitize_tag(task_id);
        loop {
            let path = self.output_dir.join(record_file_name(
                &task_id,
                RECORD_SEQ.fetch_add(1, Ordering::Relaxed),
            ));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn record_file_name(task_id: &str, seq: u64) -> String {
    format!(
        "{RECORD_PREFIX}{task_id}_{}_{seq:04}.json",
        Utc::now().format("%Y%m%d_%H%M%S_%3f")
    )
}
