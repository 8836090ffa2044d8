use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::Lsn;

/// Error type for log manager operations
#[derive(Error, Debug)]
pub enum LogManagerError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Write-ahead log collaborator for the storage core.
///
/// The buffer pool and index hold a reference to this manager so that log
/// records can be emitted ahead of page writes once recovery lands. For
/// now it only assigns LSNs; no record is ever appended by the core.
pub struct LogManager {
    log_file: Mutex<File>,
    next_lsn: AtomicU64,
}

impl LogManager {
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self, LogManagerError> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(log_path)?;

        Ok(Self {
            log_file: Mutex::new(file),
            next_lsn: AtomicU64::new(1),
        })
    }

    /// Hand out the next log sequence number
    pub fn next_lsn(&self) -> Lsn {
        self.next_lsn.fetch_add(1, Ordering::SeqCst)
    }

    /// Force buffered log content to stable storage
    pub fn flush(&self) -> Result<(), LogManagerError> {
        self.log_file.lock().flush()?;
        Ok(())
    }
}
