use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::FsError;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_BAR_WIDTH: usize = 40;

/// Knobs for one copy operation.
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    pub chunk_size: usize,
    /// Optional pause after each chunk. Pure UX pacing so a human can watch
    /// the gauge move; it is not a synchronization or cancellation point.
    pub pacing: Option<Duration>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pacing: None,
        }
    }
}

/// Stream `src` into `dest` in fixed-size chunks, invoking
/// `on_progress(copied, total)` after every chunk written.
///
/// The two opens fail distinctly so the caller can say which path was the
/// problem. The total is taken from the source before the first write. A
/// write error aborts immediately and leaves a partial destination behind.
pub fn copy_with_progress<F>(
    src: &Path,
    dest: &Path,
    options: &CopyOptions,
    mut on_progress: F,
) -> Result<u64, FsError>
where
    F: FnMut(u64, u64),
{
    let mut reader = File::open(src).map_err(|e| FsError::SourceUnreadable {
        path: src.to_path_buf(),
        source: e,
    })?;
    let total = reader
        .metadata()
        .map_err(|e| FsError::SourceUnreadable {
            path: src.to_path_buf(),
            source: e,
        })?
        .len();

    let mut writer = File::create(dest).map_err(|e| FsError::DestinationUnwritable {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let mut buf = vec![0u8; options.chunk_size.max(1)];
    let mut copied = 0u64;

    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(FsError::Io {
                    path: src.to_path_buf(),
                    source: e,
                })
            }
        };

        writer.write_all(&buf[..read]).map_err(|e| FsError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        copied += read as u64;
        on_progress(copied, total);

        if let Some(pause) = options.pacing {
            thread::sleep(pause);
        }
    }

    writer.flush().map_err(|e| FsError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    debug!(src = %src.display(), dest = %dest.display(), copied, "copy finished");
    Ok(copied)
}

/// Render the textual progress gauge.
///
/// `filled = floor(ratio * width)`, `percent = floor(ratio * 100)`, with a
/// zero-byte total treated as already complete.
pub fn render_gauge(copied: u64, total: u64, width: usize) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        (copied as f64 / total as f64).clamp(0.0, 1.0)
    };
    let filled = (ratio * width as f64) as usize;

    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        " ".repeat(width - filled),
        (ratio * 100.0) as u32,
    )
}
