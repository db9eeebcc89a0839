//! Process execution engine.
//!
//! This module provides the pieces that run a single child process:
//! - Command description (argv, working directory, environment)
//! - Concurrent capture of stdout/stderr with optional live sinks
//! - A process handle with a memoized result
//!
//! # Example
//!
//! ```no_run
//! use procshell::execution::{Command, ExecutionResult};
//! use procshell::{LocalShell, Shell};
//!
//! let shell = LocalShell::new();
//! let result: ExecutionResult = shell.run(&Command::new(["echo", "hello"])).unwrap();
//! assert_eq!(result.stdout(), b"hello\n");
//! ```

mod capture;
mod command;
mod process;
mod result;

pub use capture::{OutputSink, OutputSinks, OutputSource, SharedBuffer, StreamCapture};
pub use command::Command;
pub use process::ProcessHandle;
pub use result::{ExecutionResult, ResultReport};
