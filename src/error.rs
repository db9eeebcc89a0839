//! Error types for procshell.

use std::path::PathBuf;

use thiserror::Error;

use crate::execution::ExecutionResult;

/// Main error type for procshell operations.
#[derive(Error, Debug)]
pub enum ShellError {
    /// The program to run does not exist.
    #[error("command not found: {program}")]
    CommandNotFound { program: String },

    /// The requested working directory is missing or not a directory.
    #[error("could not change directory to {}", cwd.display())]
    CouldNotChangeDirectory { cwd: PathBuf },

    /// The child process could not be created.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An empty argument vector was given.
    #[error("command is empty")]
    EmptyCommand,

    /// I/O error on an established process stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The child exited with a non-zero status and errors were not allowed.
    #[error("{}", .0.failure_message())]
    CommandFailed(ExecutionResult),

    /// A stream drain thread panicked.
    #[error("stream drain thread panicked")]
    DrainPanicked,

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// A blocking task could not be joined.
    #[error("blocking task failed: {0}")]
    TaskJoin(String),

    /// An ignore pattern could not be parsed.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A file mode string was not understood.
    #[error("invalid open mode: {0:?}")]
    InvalidOpenMode(String),
}

impl ShellError {
    /// Whether this error was raised while creating the child process.
    pub fn is_spawn_error(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. }
                | Self::CouldNotChangeDirectory { .. }
                | Self::Spawn { .. }
                | Self::EmptyCommand
        )
    }

    /// The captured result carried by a `CommandFailed` error.
    pub fn execution_result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::CommandFailed(result) => Some(result),
            _ => None,
        }
    }
}

/// Convenience Result type for procshell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
