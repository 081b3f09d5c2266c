use std::path::PathBuf;

use clap::Parser;

use crate::copy::{DEFAULT_BAR_WIDTH, DEFAULT_CHUNK_SIZE};

/// Interactive shell-like file explorer.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct ExplorixCLI {
    /// The file command history is appended to
    #[arg(long, default_value = "history.txt")]
    pub history_file: PathBuf,

    /// Copy chunk size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Pause between copied chunks in milliseconds, 0 to disable
    #[arg(long, default_value_t = 0)]
    pub pace_ms: u64,

    /// Progress bar width in characters
    #[arg(long, default_value_t = DEFAULT_BAR_WIDTH)]
    pub bar_width: usize,
}
