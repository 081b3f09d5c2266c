use std::num::ParseIntError;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Severity, SourceSpan};
use winnow::{
    combinator::{alt, cut_err, eof, preceded},
    error::{AddContext, ErrorKind, FromExternalError, FromRecoverableError, ParserError},
    prelude::*,
    stream::{Location, Recoverable, Stream},
    token::take_while,
    LocatingSlice,
};

use crate::error::{ExplorixDiagnostic, ExplorixError};

type Input<'a> = Recoverable<LocatingSlice<&'a str>, ExplorixParserError>;
type ParserResult<T> = winnow::PResult<T, ExplorixParserError>;

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExplorixParserError {
    pub message: Option<String>,
    pub span: Option<SourceSpan>,
    pub label: Option<String>,
    pub help: Option<String>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct ExplorixParseContext {
    message: Option<String>,
    label: Option<String>,
    help: Option<String>,
    severity: Option<Severity>,
}

impl ExplorixParseContext {
    fn msg(mut self, txt: impl AsRef<str>) -> Self {
        self.message = Some(txt.as_ref().to_string());
        self
    }

    fn lbl(mut self, txt: impl AsRef<str>) -> Self {
        self.label = Some(txt.as_ref().to_string());
        self
    }

    fn hlp(mut self, txt: impl AsRef<str>) -> Self {
        self.help = Some(txt.as_ref().to_string());
        self
    }
}

fn cx() -> ExplorixParseContext {
    Default::default()
}

impl<I: Stream> ParserError<I> for ExplorixParserError {
    fn from_error_kind(_input: &I, _kind: ErrorKind) -> Self {
        Self {
            message: None,
            span: None,
            label: None,
            help: None,
            severity: None,
        }
    }

    fn append(
        self,
        _input: &I,
        _token_start: &<I as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }
}

impl<I: Stream> AddContext<I, ExplorixParseContext> for ExplorixParserError {
    fn add_context(
        mut self,
        _input: &I,
        _token_start: &<I as Stream>::Checkpoint,
        ctx: ExplorixParseContext,
    ) -> Self {
        self.message = ctx.message.or(self.message);
        self.label = ctx.label.or(self.label);
        self.help = ctx.help.or(self.help);
        self.severity = ctx.severity.or(self.severity);
        self
    }
}

impl<I: Stream + Location> FromRecoverableError<I, Self> for ExplorixParserError {
    #[inline]
    fn from_recoverable_error(
        token_start: &<I as Stream>::Checkpoint,
        _err_start: &<I as Stream>::Checkpoint,
        input: &I,
        mut e: Self,
    ) -> Self {
        e.span = e
            .span
            .or_else(|| Some(span_from_checkpoint(input, token_start)));
        e
    }
}

impl<'a> FromExternalError<Input<'a>, ParseIntError> for ExplorixParserError {
    fn from_external_error(_: &Input<'a>, _kind: ErrorKind, e: ParseIntError) -> Self {
        ExplorixParserError {
            span: None,
            message: Some(format!("{e}")),
            label: Some("invalid octal mode".into()),
            help: None,
            severity: Some(Severity::Error),
        }
    }
}

fn span_from_checkpoint<I: Stream + Location>(
    input: &I,
    start: &<I as Stream>::Checkpoint,
) -> SourceSpan {
    let offset = input.offset_from(start);
    ((input.location() - offset)..input.location()).into()
}

/// A single line of REPL input, decoded.
///
/// Unrecognized lines decode to [`Command::Unknown`] rather than failing;
/// a recognized keyword with a malformed argument string is a parse error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Command {
    /// List the current directory.
    List,
    /// Change the current directory, then list it.
    ChangeDir { dir: PathBuf },
    /// Go to the parent directory, then list it.
    ParentDir,
    /// Create an empty file.
    Touch { file: PathBuf },
    /// Delete a file.
    Delete { file: PathBuf },
    /// Chunked copy with progress display.
    Copy { from: PathBuf, to: PathBuf },
    /// Rename/move with the underlying OS rename semantics.
    Move { from: PathBuf, to: PathBuf },
    /// Print file contents to the console.
    Open { file: PathBuf },
    /// Recursive exact-name search from the current directory.
    Search { name: String },
    /// Display permission triplets.
    Permissions { file: PathBuf },
    /// Set permissions from an octal string.
    ChangeMode { file: PathBuf, mode: u32 },
    /// Print all previously entered commands.
    History,
    /// Print the command reference.
    Help,
    /// Terminate the program.
    Exit,
    /// Anything else; the line is kept for the notice.
    Unknown { line: String },
}

pub fn try_parse<'a, P, T>(mut parser: P, input: &'a str) -> Result<T, ExplorixError>
where
    P: Parser<Input<'a>, T, ExplorixParserError>,
{
    let (_, maybe_val, errs) = parser.recoverable_parse(LocatingSlice::new(input));
    if let (Some(v), true) = (maybe_val, errs.is_empty()) {
        Ok(v)
    } else {
        Err(failure_from_errs(errs, input))
    }
}

pub fn failure_from_errs(errs: Vec<ExplorixParserError>, input: &str) -> ExplorixError {
    let src = Arc::new(String::from(input));
    ExplorixError {
        input: src.clone(),
        diagnostics: errs
            .into_iter()
            .map(|e| ExplorixDiagnostic {
                input: src.clone(),
                span: e.span.unwrap_or_else(|| (0usize..0usize).into()),
                message: e
                    .message
                    .or_else(|| e.label.clone().map(|l| format!("Expected {l}"))),
                label: e.label.map(|l| format!("not {l}")),
                help: e.help,
                severity: Severity::Error,
            })
            .collect(),
    }
}

/// Decode one raw input line into a [`Command`].
pub fn parse_line(line: &str) -> Result<Command, ExplorixError> {
    try_parse(CommandParser::parse_command, line)
}

/// Parser for the explorix command line.
///
/// The grammar is deliberately flat: a keyword, one separating space, and
/// the rest of the line as the argument string. Two-argument commands split
/// that string at its first space. There is no quoting and no escaping.
pub struct CommandParser;

impl CommandParser {
    /// Parse a command from one input line.
    ///
    /// # Grammar
    ///
    /// ```md
    /// command := bare_command | unary_command | binary_command | unknown;
    /// bare_command := ("ls" | "cd.." | "history" | "help" | "exit") eof;
    /// unary_command := keyword " " rest_of_line;
    /// binary_command := keyword " " arg " " rest_of_line;
    /// ```
    fn parse_command(input: &mut Input<'_>) -> ParserResult<Command> {
        alt((
            Self::parse_exit,
            Self::parse_help,
            Self::parse_history,
            Self::parse_list,
            Self::parse_parent_dir,
            Self::parse_change_dir,
            Self::parse_touch,
            Self::parse_delete,
            Self::parse_copy,
            Self::parse_move,
            Self::parse_open,
            Self::parse_search,
            Self::parse_permissions,
            Self::parse_change_mode,
            Self::parse_unknown,
        ))
        .parse_next(input)
    }

    fn parse_exit(input: &mut Input<'_>) -> ParserResult<Command> {
        ("exit", eof).value(Command::Exit).parse_next(input)
    }

    fn parse_help(input: &mut Input<'_>) -> ParserResult<Command> {
        ("help", eof).value(Command::Help).parse_next(input)
    }

    fn parse_history(input: &mut Input<'_>) -> ParserResult<Command> {
        ("history", eof).value(Command::History).parse_next(input)
    }

    fn parse_list(input: &mut Input<'_>) -> ParserResult<Command> {
        ("ls", eof).value(Command::List).parse_next(input)
    }

    /// `cd..` is its own keyword, matched before `cd <dir>`.
    fn parse_parent_dir(input: &mut Input<'_>) -> ParserResult<Command> {
        ("cd..", eof).value(Command::ParentDir).parse_next(input)
    }

    /// # Grammar
    ///
    /// ```md
    /// change_dir := "cd" " " rest_of_line;
    /// ```
    fn parse_change_dir(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("cd", ' '),
            cut_err(
                Self::rest1.context(cx().msg("cd needs a directory").hlp("Usage: cd <dir>")),
            ),
        )
        .map(|dir| Command::ChangeDir {
            dir: PathBuf::from(dir),
        })
        .parse_next(input)
    }

    fn parse_touch(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("touch", ' '),
            cut_err(
                Self::rest1.context(cx().msg("touch needs a file name").hlp("Usage: touch <file>")),
            ),
        )
        .map(|file| Command::Touch {
            file: PathBuf::from(file),
        })
        .parse_next(input)
    }

    fn parse_delete(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("del", ' '),
            cut_err(
                Self::rest1.context(cx().msg("del needs a file name").hlp("Usage: del <file>")),
            ),
        )
        .map(|file| Command::Delete {
            file: PathBuf::from(file),
        })
        .parse_next(input)
    }

    fn parse_open(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("open", ' '),
            cut_err(
                Self::rest1.context(cx().msg("open needs a file name").hlp("Usage: open <file>")),
            ),
        )
        .map(|file| Command::Open {
            file: PathBuf::from(file),
        })
        .parse_next(input)
    }

    fn parse_search(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("search", ' '),
            cut_err(
                Self::rest1
                    .context(cx().msg("search needs an entry name").hlp("Usage: search <name>")),
            ),
        )
        .map(|name: &str| Command::Search {
            name: name.to_string(),
        })
        .parse_next(input)
    }

    fn parse_permissions(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("perm", ' '),
            cut_err(
                Self::rest1.context(cx().msg("perm needs a file name").hlp("Usage: perm <file>")),
            ),
        )
        .map(|file| Command::Permissions {
            file: PathBuf::from(file),
        })
        .parse_next(input)
    }

    /// # Grammar
    ///
    /// ```md
    /// copy := "copy" " " arg " " rest_of_line;
    /// ```
    fn parse_copy(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("copy", ' '),
            cut_err(Self::two_paths.context(
                cx().msg("copy needs a source and a destination")
                    .hlp("Usage: copy <src> <dest>"),
            )),
        )
        .map(|(from, to)| Command::Copy { from, to })
        .parse_next(input)
    }

    fn parse_move(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("move", ' '),
            cut_err(Self::two_paths.context(
                cx().msg("move needs a source and a destination")
                    .hlp("Usage: move <src> <dest>"),
            )),
        )
        .map(|(from, to)| Command::Move { from, to })
        .parse_next(input)
    }

    /// # Grammar
    ///
    /// ```md
    /// change_mode := "chmod" " " arg " " octal_digits " "*;
    /// ```
    fn parse_change_mode(input: &mut Input<'_>) -> ParserResult<Command> {
        preceded(
            ("chmod", ' '),
            cut_err(
                (
                    take_while(1.., |c: char| c != ' '),
                    ' ',
                    Self::parse_octal_mode,
                    take_while(0.., |c: char| c == ' '),
                    eof,
                )
                    .context(
                        cx().msg("chmod needs a file and an octal mode")
                            .hlp("Usage: chmod <file> <octal> (e.g., 0644)"),
                    ),
            ),
        )
        .map(|(file, _, mode, _, _): (&str, _, u32, _, _)| Command::ChangeMode {
            file: PathBuf::from(file),
            mode,
        })
        .parse_next(input)
    }

    /// Interpret the mode argument in base 8, e.g. `"0644"`.
    fn parse_octal_mode(input: &mut Input<'_>) -> ParserResult<u32> {
        take_while(1.., |c: char| c.is_ascii_digit())
            .try_map(|s: &str| u32::from_str_radix(s, 8))
            .context(cx().lbl("octal mode"))
            .parse_next(input)
    }

    /// Fallback for anything the keyword table did not claim.
    fn parse_unknown(input: &mut Input<'_>) -> ParserResult<Command> {
        take_while(0.., |_: char| true)
            .map(|line: &str| Command::Unknown {
                line: line.to_string(),
            })
            .parse_next(input)
    }

    /// Split two arguments at the first space of the argument string.
    fn two_paths(input: &mut Input<'_>) -> ParserResult<(PathBuf, PathBuf)> {
        (take_while(1.., |c: char| c != ' '), ' ', Self::rest1)
            .map(|(from, _, to): (&str, _, &str)| (PathBuf::from(from), PathBuf::from(to)))
            .parse_next(input)
    }

    /// The rest of the line, verbatim, at least one character.
    fn rest1<'a>(input: &mut Input<'a>) -> ParserResult<&'a str> {
        take_while(1.., |_: char| true).parse_next(input)
    }
}
