use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nix::sys::stat::{self, Mode, SFlag};

use crate::error::FsError;

/// What a directory entry is, as far as this tool cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// Snapshot of one `stat` call. Never cached; re-derived on every query.
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta {
    pub kind: EntryKind,
    /// Raw mode bits, permission bits included.
    pub mode: u32,
    /// Device/inode pair, used by the searcher to bound symlink cycles.
    pub dev: u64,
    pub ino: u64,
}

/// Query type and mode for a path.
pub fn inspect(path: &Path) -> Result<EntryMeta, FsError> {
    let st = stat::stat(path).map_err(|errno| FsError::from_errno(path, errno))?;

    let mode = st.st_mode as u32;
    let kind = match mode & SFlag::S_IFMT.bits() as u32 {
        m if m == SFlag::S_IFDIR.bits() as u32 => EntryKind::Directory,
        m if m == SFlag::S_IFREG.bits() as u32 => EntryKind::File,
        _ => EntryKind::Other,
    };

    Ok(EntryMeta {
        kind,
        mode,
        dev: st.st_dev as u64,
        ino: st.st_ino as u64,
    })
}

/// Replace the whole permission set of `path` with `mode`.
///
/// Applied in one chmod call; there is no partial application.
pub fn set_mode(path: &Path, mode: u32) -> Result<(), FsError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| FsError::from_io(path, e))
}

/// One read/write/execute triplet, rendered `rwx` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triplet {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { "r" } else { "-" },
            if self.write { "w" } else { "-" },
            if self.execute { "x" } else { "-" },
        )
    }
}

/// Owner/group/other permission view of a numeric mode.
///
/// A pure formatting structure; changing permissions goes through
/// [`set_mode`], never through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionSet {
    pub owner: Triplet,
    pub group: Triplet,
    pub other: Triplet,
}

impl PermissionSet {
    pub fn from_mode(mode: u32) -> Self {
        let flag = |bit: Mode| mode & bit.bits() as u32 != 0;

        Self {
            owner: Triplet {
                read: flag(Mode::S_IRUSR),
                write: flag(Mode::S_IWUSR),
                execute: flag(Mode::S_IXUSR),
            },
            group: Triplet {
                read: flag(Mode::S_IRGRP),
                write: flag(Mode::S_IWGRP),
                execute: flag(Mode::S_IXGRP),
            },
            other: Triplet {
                read: flag(Mode::S_IROTH),
                write: flag(Mode::S_IWOTH),
                execute: flag(Mode::S_IXOTH),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_inspect_classifies_files_and_directories() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("plain.txt");
        File::create(&file)?;

        assert_eq!(inspect(&file)?.kind, EntryKind::File);
        assert_eq!(inspect(dir.path())?.kind, EntryKind::Directory);
        Ok(())
    }

    #[test]
    fn test_inspect_missing_path_is_not_found() {
        let err = inspect(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn test_set_mode_round_trips_through_inspect() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("plain.txt");
        File::create(&file)?;

        set_mode(&file, 0o644)?;

        let meta = inspect(&file)?;
        assert_eq!(meta.mode & 0o777, 0o644);

        let perms = PermissionSet::from_mode(meta.mode);
        assert_eq!(perms.owner.to_string(), "rw-");
        assert_eq!(perms.group.to_string(), "r--");
        assert_eq!(perms.other.to_string(), "r--");
        Ok(())
    }

    #[test]
    fn test_triplet_rendering() {
        let cases = [
            (0o700, "rwx", "---", "---"),
            (0o751, "rwx", "r-x", "--x"),
            (0o000, "---", "---", "---"),
        ];

        for (mode, owner, group, other) in cases {
            let perms = PermissionSet::from_mode(mode);
            assert_eq!(perms.owner.to_string(), owner);
            assert_eq!(perms.group.to_string(), group);
            assert_eq!(perms.other.to_string(), other);
        }
    }
}
