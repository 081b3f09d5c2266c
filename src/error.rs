use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, SourceSpan};
use nix::errno::Errno;
use thiserror::Error;

/// Failure taxonomy for every filesystem-touching operation.
///
/// Components return these instead of printing; the dispatcher decides how
/// to render them.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    AccessDenied { path: PathBuf },

    #[error("already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// The copy source could not be opened for reading.
    #[error("cannot open source file {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy destination could not be created or written.
    #[error("cannot create destination file {}: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error` against the taxonomy, keeping the path that
    /// triggered it.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::AccessDenied { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source: err },
        }
    }

    pub fn from_errno(path: impl Into<PathBuf>, errno: Errno) -> Self {
        Self::from_io(path, io::Error::from_raw_os_error(errno as i32))
    }
}

/// Failure to parse a line of REPL input.
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
#[error("failed to parse command")]
pub struct ExplorixError {
    /// Original input that this failure came from.
    #[source_code]
    pub input: Arc<String>,

    /// Sub-diagnostics for this failure.
    #[related]
    pub diagnostics: Vec<ExplorixDiagnostic>,
}

/// An individual diagnostic message for a command parsing issue.
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
#[error("{}", message.clone().unwrap_or_else(|| "Unexpected error".into()))]
pub struct ExplorixDiagnostic {
    /// Shared source for the diagnostic.
    #[source_code]
    pub input: Arc<String>,

    /// Offset in chars of the error.
    #[label("{}", label.clone().unwrap_or_else(|| "here".into()))]
    pub span: SourceSpan,

    /// Message for the error itself.
    pub message: Option<String>,

    /// Label text for this span. Defaults to `"here"`.
    pub label: Option<String>,

    /// Usage hint for fixing the command.
    #[help]
    pub help: Option<String>,

    /// Severity level for the Diagnostic.
    #[diagnostic(severity)]
    pub severity: miette::Severity,
}
