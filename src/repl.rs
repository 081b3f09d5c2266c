use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::path::Path;

use byte_unit::{Byte, UnitType};
use miette::{IntoDiagnostic, Result};
use tracing::warn;

use crate::copy::{render_gauge, DEFAULT_BAR_WIDTH};
use crate::error::FsError;
use crate::history::HistoryLog;
use crate::inspect::EntryKind;
use crate::parser::{self, Command};
use crate::system::System;

static SEPARATOR: &str = "========================================";

static HELP: &str = "\
Available commands:
  ls                     list files
  cd <dir>               open directory
  cd..                   go up one level
  touch <file>           create file
  del <file>             delete file
  copy <src> <dest>      copy file with progress bar
  move <src> <dest>      move/rename file or directory
  open <file>            view file contents
  search <name>          recursive search
  perm <file>            view permissions
  chmod <file> <octal>   change permissions (e.g., 0644)
  history                show command history
  help                   show this help menu
  exit                   quit explorer";

/// The read-eval-print loop tying the components together.
///
/// Generic over its streams so whole sessions can run against in-memory
/// buffers in tests. Every raw input line is appended to the history log
/// before it is interpreted; no operation failure terminates the loop.
pub struct Repl<I, O, S>
where
    I: BufRead,
    O: Write,
    S: System,
{
    input_stream: I,
    output_stream: O,
    system: S,
    history: HistoryLog,
    bar_width: usize,
}

impl<I, O, S> Repl<I, O, S>
where
    I: BufRead,
    O: Write,
    S: System,
{
    pub fn new(input_stream: I, output_stream: O, system: S, history: HistoryLog) -> Self {
        Self {
            input_stream,
            output_stream,
            system,
            history,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    pub fn with_bar_width(mut self, bar_width: usize) -> Self {
        self.bar_width = bar_width;
        self
    }

    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
        writeln!(self.output_stream, "explorix file explorer").into_diagnostic()?;
        writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
        self.print_listing()?;
        writeln!(self.output_stream, "{HELP}").into_diagnostic()?;

        let mut buffer = String::new();

        loop {
            write!(self.output_stream, "\n{} > ", self.system.cwd().display())
                .into_diagnostic()?;
            self.output_stream.flush().into_diagnostic()?;

            buffer.clear();
            let read = self
                .input_stream
                .read_line(&mut buffer)
                .into_diagnostic()?;
            if read == 0 {
                // End of input terminates the session like `exit`.
                break;
            }
            let line = buffer.trim_end_matches(['\r', '\n']).to_string();

            if let Err(err) = self.history.append(&line) {
                warn!(%err, "could not record history");
            }

            match parser::parse_line(&line) {
                Ok(command) => {
                    if self.dispatch(command)?.is_break() {
                        break;
                    }
                }
                Err(err) => {
                    writeln!(self.output_stream, "{:?}", miette::Report::new(err))
                        .into_diagnostic()?;
                }
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> Result<ControlFlow<()>> {
        match command {
            Command::List => self.print_listing()?,
            Command::ChangeDir { dir } => match self.system.change_dir(&dir) {
                Ok(()) => self.print_listing()?,
                Err(err) => self.report(err)?,
            },
            Command::ParentDir => match self.system.parent_dir() {
                Ok(()) => self.print_listing()?,
                Err(err) => self.report(err)?,
            },
            Command::Touch { file } => match self.system.touch(&file) {
                Ok(()) => {
                    writeln!(self.output_stream, "created file: {}", file.display())
                        .into_diagnostic()?;
                    self.print_listing()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::Delete { file } => match self.system.delete(&file) {
                Ok(()) => {
                    writeln!(self.output_stream, "deleted: {}", file.display())
                        .into_diagnostic()?;
                    self.print_listing()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::Copy { from, to } => self.run_copy(&from, &to)?,
            Command::Move { from, to } => match self.system.rename(&from, &to) {
                Ok(()) => {
                    writeln!(
                        self.output_stream,
                        "moved: {} -> {}",
                        from.display(),
                        to.display()
                    )
                    .into_diagnostic()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::Open { file } => match self.system.read_file(&file) {
                Ok(text) => {
                    writeln!(self.output_stream, "contents of {}:", file.display())
                        .into_diagnostic()?;
                    writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
                    write!(self.output_stream, "{text}").into_diagnostic()?;
                    if !text.is_empty() && !text.ends_with('\n') {
                        writeln!(self.output_stream).into_diagnostic()?;
                    }
                    writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::Search { name } => {
                writeln!(self.output_stream, "searching for: {name}").into_diagnostic()?;
                let outcome = self.system.search(&name);
                for found in &outcome.matches {
                    writeln!(self.output_stream, "found: {}", found.display())
                        .into_diagnostic()?;
                }
                writeln!(
                    self.output_stream,
                    "{} match(es), {} unreadable director(ies) skipped",
                    outcome.matches.len(),
                    outcome.skipped_dirs
                )
                .into_diagnostic()?;
            }
            Command::Permissions { file } => match self.system.permissions(&file) {
                Ok(perms) => {
                    writeln!(self.output_stream, "permissions for: {}", file.display())
                        .into_diagnostic()?;
                    writeln!(self.output_stream, "owner:  {}", perms.owner).into_diagnostic()?;
                    writeln!(self.output_stream, "group:  {}", perms.group).into_diagnostic()?;
                    writeln!(self.output_stream, "others: {}", perms.other).into_diagnostic()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::ChangeMode { file, mode } => match self.system.change_mode(&file, mode) {
                Ok(()) => {
                    writeln!(
                        self.output_stream,
                        "permissions updated for: {}",
                        file.display()
                    )
                    .into_diagnostic()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::History => match self.history.entries() {
                Ok(lines) => {
                    writeln!(self.output_stream, "command history:").into_diagnostic()?;
                    writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
                    for line in lines {
                        writeln!(self.output_stream, "{line}").into_diagnostic()?;
                    }
                    writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
                }
                Err(err) => self.report(err)?,
            },
            Command::Help => writeln!(self.output_stream, "{HELP}").into_diagnostic()?,
            Command::Unknown { .. } => {
                writeln!(
                    self.output_stream,
                    "unknown command, type 'help' to see options"
                )
                .into_diagnostic()?;
            }
            Command::Exit => {
                writeln!(self.output_stream, "exiting explorer").into_diagnostic()?;
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn run_copy(&mut self, from: &Path, to: &Path) -> Result<()> {
        let bar_width = self.bar_width;
        let output = &mut self.output_stream;

        let result = self.system.copy(from, to, &mut |copied, total| {
            // Display failures must not abort the copy itself.
            let _ = write!(output, "\r{}", render_gauge(copied, total, bar_width));
            let _ = output.flush();
        });

        writeln!(self.output_stream).into_diagnostic()?;
        match result {
            Ok(_) => {
                writeln!(
                    self.output_stream,
                    "copied: {} -> {}",
                    from.display(),
                    to.display()
                )
                .into_diagnostic()?;
            }
            Err(err) => self.report(err)?,
        }
        Ok(())
    }

    fn print_listing(&mut self) -> Result<()> {
        let listing = match self.system.list() {
            Ok(listing) => listing,
            Err(err) => return self.report(err),
        };

        writeln!(
            self.output_stream,
            "current directory: {}",
            self.system.cwd().display()
        )
        .into_diagnostic()?;
        writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
        for entry in &listing.entries {
            match entry.kind {
                EntryKind::Directory => {
                    writeln!(self.output_stream, "{}/", entry.name).into_diagnostic()?;
                }
                EntryKind::File | EntryKind::Other => {
                    writeln!(
                        self.output_stream,
                        "{}  ({})",
                        entry.name,
                        Byte::from_u64(entry.size_in_bytes)
                            .get_appropriate_unit(UnitType::Binary)
                    )
                    .into_diagnostic()?;
                }
            }
        }
        writeln!(self.output_stream, "{SEPARATOR}").into_diagnostic()?;
        writeln!(
            self.output_stream,
            "disk: {} free of {}",
            Byte::from_u64(listing.disk.available_bytes).get_appropriate_unit(UnitType::Binary),
            Byte::from_u64(listing.disk.total_bytes).get_appropriate_unit(UnitType::Binary),
        )
        .into_diagnostic()?;
        Ok(())
    }

    fn report(&mut self, err: FsError) -> Result<()> {
        writeln!(self.output_stream, "error: {err}").into_diagnostic()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::CopyOptions;
    use crate::system::LocalSystem;
    use anyhow::Result;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn run_session(dir: &Path, script: &str) -> Result<(String, HistoryLog)> {
        let system = LocalSystem::new(fs::canonicalize(dir)?, CopyOptions::default());
        let history = HistoryLog::new(dir.join("history.txt"));

        let mut output = Vec::new();
        Repl::new(
            Cursor::new(script.as_bytes().to_vec()),
            &mut output,
            system,
            history.clone(),
        )
        .run()
        .map_err(|e| anyhow::anyhow!(e))?;

        Ok((String::from_utf8(output)?, history))
    }

    #[test]
    fn test_every_line_lands_in_history_in_order() -> Result<()> {
        let dir = tempdir()?;
        let script = "ls\nfrobnicate\ncopy lonely.txt\ntouch a.txt\nexit\n";

        let (_, history) = run_session(dir.path(), script)?;

        // Unknown and malformed lines included, verbatim, exactly once.
        assert_eq!(
            history.entries()?,
            ["ls", "frobnicate", "copy lonely.txt", "touch a.txt", "exit"]
        );
        Ok(())
    }

    #[test]
    fn test_touch_creates_file_and_relists() -> Result<()> {
        let dir = tempdir()?;

        let (output, _) = run_session(dir.path(), "touch notes.txt\nexit\n")?;

        assert!(dir.path().join("notes.txt").exists());
        assert!(output.contains("created file: notes.txt"));
        assert!(output.contains("notes.txt  ("));
        Ok(())
    }

    #[test]
    fn test_unknown_command_prints_notice_and_loop_continues() -> Result<()> {
        let dir = tempdir()?;

        let (output, _) = run_session(dir.path(), "frobnicate\ntouch ok.txt\nexit\n")?;

        assert!(output.contains("unknown command"));
        assert!(dir.path().join("ok.txt").exists());
        Ok(())
    }

    #[test]
    fn test_operation_failure_is_reported_inline_and_not_fatal() -> Result<()> {
        let dir = tempdir()?;

        let (output, _) = run_session(dir.path(), "del missing.txt\ntouch ok.txt\nexit\n")?;

        assert!(output.contains("error: no such file or directory"));
        assert!(dir.path().join("ok.txt").exists());
        Ok(())
    }

    #[test]
    fn test_end_of_input_terminates_gracefully() -> Result<()> {
        let dir = tempdir()?;

        // No `exit`; the pipe just closes.
        let (output, _) = run_session(dir.path(), "ls\n")?;

        assert!(output.contains("current directory:"));
        Ok(())
    }

    #[test]
    fn test_copy_renders_gauge_and_copies_bytes() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("src.txt"), b"payload")?;

        let (output, _) = run_session(dir.path(), "copy src.txt dest.txt\nexit\n")?;

        assert!(output.contains("] 100%"));
        assert!(output.contains("copied: src.txt -> dest.txt"));
        assert_eq!(fs::read(dir.path().join("dest.txt"))?, b"payload");
        Ok(())
    }

    #[test]
    fn test_search_prints_matches_and_summary() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("sub/needle.txt"), b"")?;

        let (output, _) = run_session(dir.path(), "search needle.txt\nexit\n")?;

        assert!(output.contains("searching for: needle.txt"));
        assert!(output.contains("needle.txt"));
        assert!(output.contains("1 match(es), 0 unreadable director(ies) skipped"));
        Ok(())
    }

    #[test]
    fn test_chmod_then_perm_shows_triplets() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("mode.txt"), b"")?;

        let script = "chmod mode.txt 0644\nperm mode.txt\nexit\n";
        let (output, _) = run_session(dir.path(), script)?;

        assert!(output.contains("permissions updated for: mode.txt"));
        assert!(output.contains("owner:  rw-"));
        assert!(output.contains("group:  r--"));
        assert!(output.contains("others: r--"));
        Ok(())
    }

    #[test]
    fn test_history_command_replays_session() -> Result<()> {
        let dir = tempdir()?;

        let (output, _) = run_session(dir.path(), "ls\nhistory\nexit\n")?;

        let replay = output
            .split("command history:")
            .nth(1)
            .expect("history section");
        assert!(replay.contains("ls"));
        assert!(replay.contains("history"));
        Ok(())
    }

    #[test]
    fn test_cd_changes_prompt_and_lists() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("sub/inner.txt"), b"")?;

        let (output, _) = run_session(dir.path(), "cd sub\ncd..\nexit\n")?;

        assert!(output.contains("inner.txt"));
        let canonical = fs::canonicalize(dir.path())?;
        assert!(output.contains(&format!("{} > ", canonical.join("sub").display())));
        Ok(())
    }
}
