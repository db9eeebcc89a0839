//! Execution result types.

use serde::Serialize;

use crate::error::ShellError;
use crate::Result;

/// Outcome of a finished child process.
///
/// Holds the exit status and everything the child wrote to its two output
/// streams. The value is immutable once built; every transport produces the
/// same shape so callers can treat local and remote runs alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    status: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(status: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            status,
            stdout,
            stderr,
        }
    }

    /// Exit status. Negative values are terminating signals on Unix.
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Raw bytes written to standard output.
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Raw bytes written to standard error.
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Check if the command succeeded (exit status 0).
    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Standard output decoded as UTF-8 (lossy).
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded as UTF-8 (lossy).
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Get standard output as a trimmed string.
    pub fn output_trimmed(&self) -> String {
        self.stdout_text().trim().to_string()
    }

    /// Get standard output lines.
    pub fn output_lines(&self) -> Vec<String> {
        self.stdout_text().lines().map(str::to_string).collect()
    }

    /// Apply the error policy.
    ///
    /// With `allow_error` set the result is always returned. Otherwise a
    /// non-zero status becomes [`ShellError::CommandFailed`], carrying this
    /// result so the captured output is not lost.
    pub fn check(self, allow_error: bool) -> Result<Self> {
        if allow_error || self.is_success() {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }

    /// Convert into a `CommandFailed` error regardless of status.
    pub fn to_error(&self) -> ShellError {
        ShellError::CommandFailed(self.clone())
    }

    pub(crate) fn failure_message(&self) -> String {
        format!(
            "return code: {}\noutput: {}\nstderr output: {}",
            self.status,
            self.stdout_text(),
            self.stderr_text()
        )
    }
}

/// Serializable summary of an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultReport {
    pub status: i32,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<&ExecutionResult> for ResultReport {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            status: result.status,
            success: result.is_success(),
            stdout: result.stdout_text(),
            stderr: result.stderr_text(),
        }
    }
}
