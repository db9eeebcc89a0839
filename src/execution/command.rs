//! Command building and representation.

use std::collections::HashMap;
use std::path::PathBuf;

/// A command to be spawned as a child process.
///
/// The argument vector is passed to the OS as-is; no shell parsing happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Working directory override (if any).
    pub working_dir: Option<PathBuf>,
    /// Environment overrides, merged over the inherited environment.
    pub env: HashMap<String, String>,
    /// Place the child in its own process group.
    pub new_process_group: bool,
    /// Return a failed result instead of raising `CommandFailed`.
    pub allow_error: bool,
}

impl Command {
    /// Create a new command from an argument vector.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Set whether the child gets its own process group.
    pub fn new_process_group(mut self, enabled: bool) -> Self {
        self.new_process_group = enabled;
        self
    }

    /// Set whether a non-zero exit status is tolerated by `run`.
    pub fn allow_error(mut self, allow: bool) -> Self {
        self.allow_error = allow;
        self
    }

    /// The program name, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}
