use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::copy::{self, CopyOptions};
use crate::error::FsError;
use crate::inspect::{self, EntryKind, PermissionSet};
use crate::lister::{self, DirEntry, DiskUsage};
use crate::search::{self, SearchOutcome};

/// A directory listing plus the storage totals printed under it.
pub struct ListOutput {
    pub entries: Vec<DirEntry>,
    pub disk: DiskUsage,
}

/// A system that can execute commands.
///
/// This trait is the seam between the REPL and the filesystem; every
/// operation re-derives its state from the filesystem when called.
pub trait System {
    /// The current working directory.
    fn cwd(&self) -> &Path;
    /// List the current directory.
    fn list(&self) -> Result<ListOutput, FsError>;
    /// Change the current directory.
    fn change_dir(&mut self, dir: &Path) -> Result<(), FsError>;
    /// Go to the parent of the current directory.
    fn parent_dir(&mut self) -> Result<(), FsError>;
    /// Create a new empty file.
    fn touch(&mut self, file: &Path) -> Result<(), FsError>;
    /// Delete a file.
    fn delete(&mut self, file: &Path) -> Result<(), FsError>;
    /// Chunked copy, reporting progress through the callback.
    fn copy(
        &mut self,
        from: &Path,
        to: &Path,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<u64, FsError>;
    /// Rename/move with the OS rename semantics.
    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError>;
    /// Read a file's contents as (lossy) text.
    fn read_file(&self, file: &Path) -> Result<String, FsError>;
    /// Recursive exact-name search from the current directory.
    fn search(&self, name: &str) -> SearchOutcome;
    /// Permission triplets for a file.
    fn permissions(&self, file: &Path) -> Result<PermissionSet, FsError>;
    /// Replace a file's permission set with a numeric mode.
    fn change_mode(&mut self, file: &Path, mode: u32) -> Result<(), FsError>;
}

/// The real filesystem, with the working directory held as an explicit
/// field instead of process-wide state. Only [`System::change_dir`] and
/// [`System::parent_dir`] mutate it; every path-resolving operation reads
/// it.
pub struct LocalSystem {
    current_dir: PathBuf,
    copy_options: CopyOptions,
}

impl LocalSystem {
    pub fn new(current_dir: PathBuf, copy_options: CopyOptions) -> Self {
        Self {
            current_dir,
            copy_options,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

impl System for LocalSystem {
    fn cwd(&self) -> &Path {
        &self.current_dir
    }

    fn list(&self) -> Result<ListOutput, FsError> {
        Ok(ListOutput {
            entries: lister::list(&self.current_dir)?,
            disk: lister::disk_usage(&self.current_dir)?,
        })
    }

    fn change_dir(&mut self, dir: &Path) -> Result<(), FsError> {
        let resolved = self.resolve(dir);
        let canonical = fs::canonicalize(&resolved).map_err(|e| FsError::from_io(&resolved, e))?;

        if inspect::inspect(&canonical)?.kind != EntryKind::Directory {
            return Err(FsError::NotADirectory { path: resolved });
        }

        debug!(from = %self.current_dir.display(), to = %canonical.display(), "cd");
        self.current_dir = canonical;
        Ok(())
    }

    fn parent_dir(&mut self) -> Result<(), FsError> {
        // At the filesystem root `cd..` stays put, same as chdir("..").
        self.current_dir.pop();
        Ok(())
    }

    fn touch(&mut self, file: &Path) -> Result<(), FsError> {
        let resolved = self.resolve(file);
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resolved)
            .map_err(|e| FsError::from_io(&resolved, e))?;
        Ok(())
    }

    fn delete(&mut self, file: &Path) -> Result<(), FsError> {
        let resolved = self.resolve(file);
        fs::remove_file(&resolved).map_err(|e| FsError::from_io(&resolved, e))
    }

    fn copy(
        &mut self,
        from: &Path,
        to: &Path,
        on_progress: &mut dyn FnMut(u64, u64),
    ) -> Result<u64, FsError> {
        copy::copy_with_progress(
            &self.resolve(from),
            &self.resolve(to),
            &self.copy_options,
            on_progress,
        )
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError> {
        let source = self.resolve(from);
        fs::rename(&source, self.resolve(to)).map_err(|e| FsError::from_io(&source, e))
    }

    fn read_file(&self, file: &Path) -> Result<String, FsError> {
        let resolved = self.resolve(file);
        let bytes = fs::read(&resolved).map_err(|e| FsError::from_io(&resolved, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn search(&self, name: &str) -> SearchOutcome {
        search::search(name, &self.current_dir)
    }

    fn permissions(&self, file: &Path) -> Result<PermissionSet, FsError> {
        let meta = inspect::inspect(&self.resolve(file))?;
        Ok(PermissionSet::from_mode(meta.mode))
    }

    fn change_mode(&mut self, file: &Path, mode: u32) -> Result<(), FsError> {
        inspect::set_mode(&self.resolve(file), mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn system_in(dir: &Path) -> Result<LocalSystem> {
        Ok(LocalSystem::new(
            fs::canonicalize(dir)?,
            CopyOptions::default(),
        ))
    }

    fn names(system: &LocalSystem) -> Result<Vec<String>> {
        let mut names: Vec<String> = system.list()?.entries.into_iter().map(|e| e.name).collect();
        names.sort();
        Ok(names)
    }

    #[test]
    fn test_change_dir_and_parent_thread_explicit_state() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        let mut system = system_in(dir.path())?;
        let start = system.cwd().to_path_buf();

        system.change_dir(Path::new("sub"))?;
        assert_eq!(system.cwd(), start.join("sub"));

        system.parent_dir()?;
        assert_eq!(system.cwd(), start);
        Ok(())
    }

    #[test]
    fn test_change_dir_rejects_files_and_missing_paths() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("plain.txt"), b"x")?;
        let mut system = system_in(dir.path())?;

        let err = system.change_dir(Path::new("missing")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));

        let err = system.change_dir(Path::new("plain.txt")).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
        Ok(())
    }

    #[test]
    fn test_relative_paths_resolve_against_current_dir() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        let mut system = system_in(dir.path())?;

        system.change_dir(Path::new("sub"))?;
        system.touch(Path::new("inner.txt"))?;

        assert!(dir.path().join("sub/inner.txt").exists());
        Ok(())
    }

    #[test]
    fn test_touch_refuses_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let mut system = system_in(dir.path())?;

        system.touch(Path::new("new.txt"))?;
        let err = system.touch(Path::new("new.txt")).unwrap_err();

        assert!(matches!(err, FsError::AlreadyExists { .. }));
        Ok(())
    }

    #[test]
    fn test_delete_removes_and_reports_missing() -> Result<()> {
        let dir = tempdir()?;
        let mut system = system_in(dir.path())?;

        system.touch(Path::new("gone.txt"))?;
        system.delete(Path::new("gone.txt"))?;
        assert!(!dir.path().join("gone.txt").exists());

        let err = system.delete(Path::new("gone.txt")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
        Ok(())
    }

    #[test]
    fn test_rename_within_a_directory_updates_listing() -> Result<()> {
        let dir = tempdir()?;
        let mut system = system_in(dir.path())?;
        system.touch(Path::new("before.txt"))?;

        system.rename(Path::new("before.txt"), Path::new("after.txt"))?;

        assert_eq!(names(&system)?, ["after.txt"]);
        Ok(())
    }

    #[test]
    fn test_rename_across_directories_updates_both_listings() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        let mut system = system_in(dir.path())?;
        system.touch(Path::new("roaming.txt"))?;

        system.rename(Path::new("roaming.txt"), Path::new("sub/roaming.txt"))?;

        assert_eq!(names(&system)?, ["sub"]);
        system.change_dir(Path::new("sub"))?;
        assert_eq!(names(&system)?, ["roaming.txt"]);
        Ok(())
    }

    #[test]
    fn test_read_file_returns_contents() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("story.txt"), "once upon a time\n")?;
        let system = system_in(dir.path())?;

        assert_eq!(
            system.read_file(Path::new("story.txt"))?,
            "once upon a time\n"
        );
        Ok(())
    }

    #[test]
    fn test_chmod_then_permissions_reports_triplets() -> Result<()> {
        let dir = tempdir()?;
        let mut system = system_in(dir.path())?;
        system.touch(Path::new("mode.txt"))?;

        system.change_mode(Path::new("mode.txt"), 0o644)?;
        let perms = system.permissions(Path::new("mode.txt"))?;

        assert_eq!(perms.owner.to_string(), "rw-");
        assert_eq!(perms.group.to_string(), "r--");
        assert_eq!(perms.other.to_string(), "r--");
        Ok(())
    }

    #[test]
    fn test_search_starts_at_current_dir() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("sub/needle.txt"), b"")?;
        fs::write(dir.path().join("needle.txt"), b"")?;
        let mut system = system_in(dir.path())?;

        system.change_dir(Path::new("sub"))?;
        let outcome = system.search("needle.txt");

        assert_eq!(outcome.matches.len(), 1);
        Ok(())
    }
}
