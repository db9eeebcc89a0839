//! Execution targets.
//!
//! A [`Shell`] can spawn processes, run them to completion and move files
//! around on its target. [`LocalShell`] runs everything on this machine;
//! other transports implement the same traits so callers stay agnostic.

pub mod files;
mod local;

pub use local::LocalShell;

use std::path::Path;

use crate::execution::{Command, ExecutionResult, OutputSinks, ProcessHandle};
use crate::Result;

/// A running (or finished) process on some target.
pub trait Process {
    /// Non-blocking liveness check.
    fn is_running(&self) -> Result<bool>;

    /// Write to the process's standard input.
    fn stdin_write(&self, bytes: &[u8]) -> Result<()>;

    /// Close the process's standard input.
    fn close_stdin(&self) -> Result<()>;

    /// Block until the process exits; the result is computed once.
    fn wait_for_result(&self) -> Result<ExecutionResult>;
}

impl Process for ProcessHandle {
    fn is_running(&self) -> Result<bool> {
        ProcessHandle::is_running(self)
    }

    fn stdin_write(&self, bytes: &[u8]) -> Result<()> {
        ProcessHandle::stdin_write(self, bytes)
    }

    fn close_stdin(&self) -> Result<()> {
        ProcessHandle::close_stdin(self)
    }

    fn wait_for_result(&self) -> Result<ExecutionResult> {
        ProcessHandle::wait_for_result(self)
    }
}

/// Capabilities of an execution target.
pub trait Shell {
    /// Handle type returned by `spawn`.
    type Process: Process;
    /// File handle type returned by `open`.
    type File;
    /// Temporary directory guard returned by `temporary_dir`.
    type TempDir;

    /// Start a command, forwarding its output to `sinks` as it arrives.
    fn spawn_with(&self, command: &Command, sinks: OutputSinks) -> Result<Self::Process>;

    /// Start a command without live sinks.
    fn spawn(&self, command: &Command) -> Result<Self::Process> {
        self.spawn_with(command, OutputSinks::new())
    }

    /// Run a command to completion, applying its error policy.
    fn run_with(&self, command: &Command, sinks: OutputSinks) -> Result<ExecutionResult> {
        let process = self.spawn_with(command, sinks)?;
        process.wait_for_result()?.check(command.allow_error)
    }

    /// Run a command to completion without live sinks.
    fn run(&self, command: &Command) -> Result<ExecutionResult> {
        self.run_with(command, OutputSinks::new())
    }

    /// Recursively copy a directory, skipping names matching `ignore` globs.
    fn upload_dir(&self, source: &Path, dest: &Path, ignore: &[&str]) -> Result<()>;

    /// Copy a single file.
    fn upload_file(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Open a file with a mode string such as `"r"`, `"wb"` or `"a+"`.
    fn open(&self, path: &Path, mode: &str) -> Result<Self::File>;

    /// Write a file, creating parent directories as needed.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Create a temporary directory that is removed when dropped.
    fn temporary_dir(&self) -> Result<Self::TempDir>;
}
