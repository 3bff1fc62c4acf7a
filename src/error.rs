use crate::command::ExitCode;
use crate::parser::SyntaxError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while evaluating one input line.
///
/// Variants carrying an [`io::Error`] keep it as the source so the operating
/// system's own message reaches the user unmodified.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The line could not be split into a pipeline.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// `cd` or `exit` was used as one stage of a multi-stage pipeline.
    #[error("cannot use built-in command '{0}' in pipeline")]
    BuiltinInPipeline(String),

    /// No executable with this name was found in `PATH`.
    #[error("{name}: command not found")]
    NotFound { name: String },

    /// The operating system refused to start the process.
    #[error("{name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The process ran but did not exit successfully.
    #[error("{name}: exited with status {code}")]
    Exited { name: String, code: ExitCode },

    #[error("cd: {}: {source}", path.display())]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A builtin rejected its arguments.
    #[error("{name}: {message}")]
    Usage { name: String, message: String },

    /// Reading or writing the history log failed.
    #[error("history: {0}")]
    History(#[source] io::Error),

    /// The pipeline was interrupted. Never shown to the user.
    #[error("interrupted")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShellError::Cancelled)
    }
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;
