use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::inspect::{self, EntryKind};

/// Result of one recursive search.
///
/// Unreadable directories are skipped rather than failing the traversal;
/// the count makes that policy visible instead of silent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Paths whose final component equals the target, in traversal order.
    pub matches: Vec<PathBuf>,
    /// Directories (the root included) that could not be opened.
    pub skipped_dirs: u32,
}

/// Depth-first pre-order search for entries named exactly `target`.
///
/// Matching is case-sensitive and not a glob. Every match is reported and
/// traversal continues past it. Entries whose metadata cannot be read are
/// skipped. Directories already entered, identified by their `(dev, ino)`
/// pair, are not entered again, so symlink cycles terminate.
pub fn search(target: &str, root: &Path) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    let mut visited = HashSet::new();

    if let Ok(meta) = inspect::inspect(root) {
        visited.insert((meta.dev, meta.ino));
    }
    walk(target, root, &mut visited, &mut outcome);

    outcome
}

fn walk(
    target: &str,
    dir: &Path,
    visited: &mut HashSet<(u64, u64)>,
    outcome: &mut SearchOutcome,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "skipping unreadable directory");
            outcome.skipped_dirs += 1;
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = dir.join(entry.file_name());

        let meta = match inspect::inspect(&path) {
            Ok(meta) => meta,
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_name().to_str() == Some(target) {
            outcome.matches.push(path.clone());
        }

        if meta.kind == EntryKind::Directory {
            if visited.insert((meta.dev, meta.ino)) {
                walk(target, &path, visited, outcome);
            } else {
                debug!(path = %path.display(), "already visited, not re-entering");
            }
        }
    }
}
