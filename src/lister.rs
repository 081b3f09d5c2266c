use std::fs;
use std::path::Path;

use nix::sys::statfs;

use crate::error::FsError;
use crate::inspect::EntryKind;

/// One immediate child of a listed directory. Derived per call, never
/// cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size_in_bytes: u64,
}

/// Storage totals for the filesystem holding a listed directory.
#[derive(Debug, Clone, Copy)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Enumerate the immediate children of `dir` in the order the OS returns
/// them. Self and parent references are excluded; an entry whose type
/// cannot be read is still listed, as [`EntryKind::Other`].
pub fn list(dir: &Path) -> Result<Vec<DirEntry>, FsError> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| FsError::from_io(dir, e))? {
        let entry = entry.map_err(|e| FsError::from_io(dir, e))?;

        let kind = match entry.file_type() {
            Ok(t) if t.is_dir() => EntryKind::Directory,
            Ok(t) if t.is_file() => EntryKind::File,
            _ => EntryKind::Other,
        };
        let size_in_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);

        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            size_in_bytes,
        });
    }

    Ok(entries)
}

/// Total and available space on the filesystem holding `path`.
pub fn disk_usage(path: &Path) -> Result<DiskUsage, FsError> {
    let stat = statfs::statfs(path).map_err(|errno| FsError::from_errno(path, errno))?;

    let block_size = stat.block_size() as u64;
    Ok(DiskUsage {
        total_bytes: stat.blocks() as u64 * block_size,
        available_bytes: stat.blocks_available() as u64 * block_size,
    })
}
