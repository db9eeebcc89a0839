//! # procshell
//!
//! Run commands as child processes and collect their output.
//!
//! This crate spawns a process from an argument vector, drains its stdout
//! and stderr concurrently (so neither pipe can fill up and stall the
//! child), optionally tees both streams to caller-supplied sinks in real
//! time, and produces a single memoized [`ExecutionResult`].
//!
//! ## Features
//!
//! - **Deadlock-free capture**: one drain thread per output stream
//! - **Live sinks**: forward output as it arrives while still buffering it
//! - **Memoized results**: `wait_for_result` reaps the child exactly once
//! - **Transport-agnostic traits**: [`Shell`] and [`Process`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use procshell::{Command, LocalShell, Shell};
//!
//! fn main() -> procshell::Result<()> {
//!     procshell::logging::try_init().ok();
//!
//!     let shell = LocalShell::new();
//!
//!     let result = shell.run(&Command::new(["echo", "hello"]))?;
//!     assert_eq!(result.stdout(), b"hello\n");
//!
//!     let failed = shell.run(&Command::new(["sh", "-c", "exit 3"]).allow_error(true))?;
//!     assert_eq!(failed.status(), 3);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod shell;

// Re-export commonly used types
pub use error::{Result, ShellError};
pub use execution::{
    Command, ExecutionResult, OutputSinks, ProcessHandle, SharedBuffer, StreamCapture,
};
pub use shell::{LocalShell, Process, Shell};
