// Response log
// Append-only CSV record of every question and the answer it received


use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{Terminator, Writer, WriterBuilder};
use tracing::{debug, info};

use crate::{ChatError, Result};

pub const HEADER: [&str; 2] = ["Question", "Answer"];

/// An open handle on the response log file
pub struct ResponseLog {
    path: PathBuf,
    writer: Writer<File>,
}

impl fmt::Debug for ResponseLog {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ResponseLog {
    /// Open `path` for appending, creating it and its parent directory if needed
    ///
    /// The header row is written only when the file is empty, so reopening
    /// an existing log never duplicates it.
    #[inline]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ChatError::Log(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ChatError::Log(format!("Failed to open {}: {}", path.display(), e)))?;

        let is_empty = file
            .metadata()
            .map_err(|e| ChatError::Log(format!("Failed to stat {}: {}", path.display(), e)))?
            .len()
            == 0;

        let writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        let mut log = Self {
            path: path.to_path_buf(),
            writer,
        };

        if is_empty {
            info!("Starting new response log at {}", path.display());
            log.write_row(&HEADER)?;
        } else {
            debug!("Appending to existing response log {}", path.display());
        }

        Ok(log)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one question and answer pair and flush it to disk
    #[inline]
    pub fn record(&mut self, question: &str, answer: &str) -> Result<()> {
        self.write_row(&[question, answer])?;
        debug!("Recorded response in {}", self.path.display());
        Ok(())
    }

    fn write_row(&mut self, row: &[&str; 2]) -> Result<()> {
        self.writer.write_record(row).map_err(|e| {
            ChatError::Log(format!("Failed to write to {}: {}", self.path.display(), e))
        })?;
        self.writer.flush().map_err(|e| {
            ChatError::Log(format!("Failed to flush {}: {}", self.path.display(), e))
        })
    }
}
