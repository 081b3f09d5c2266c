use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::error::FsError;

/// Append-only log of every raw input line, one per line.
///
/// The file is opened, written and closed anew on each append; there is no
/// long-lived handle, so the log survives across process invocations and
/// never holds the file open between commands.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one raw line, verbatim, creating the file on first write.
    pub fn append(&self, line: &str) -> Result<(), FsError> {
        let mut log = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| FsError::from_io(&self.path, e))?;

        writeln!(log, "{line}").map_err(|e| FsError::from_io(&self.path, e))?;
        debug!(line, "logged command");
        Ok(())
    }

    /// Replay every previously entered line in submission order.
    ///
    /// A log that has never been written replays as empty.
    pub fn entries(&self) -> Result<Vec<String>, FsError> {
        let log = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FsError::from_io(&self.path, e)),
        };

        BufReader::new(log)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| FsError::from_io(&self.path, e))
    }
}
