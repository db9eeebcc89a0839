//! Shell backed by the local machine.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tracing::debug;

use super::{files, Shell};
use crate::error::ShellError;
use crate::execution::{Command, ExecutionResult, OutputSinks, ProcessHandle};
use crate::Result;

/// Windows `CREATE_NEW_PROCESS_GROUP` creation flag.
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone, Default)]
pub struct LocalShell {
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    new_process_group: bool,
}

impl LocalShell {
    /// Create a shell that inherits this process's directory and environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default working directory for commands that do not set one.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Environment overrides applied to every command, beneath the
    /// command's own overrides.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
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

    /// Put every spawned child in its own process group.
    pub fn with_new_process_group(mut self, enabled: bool) -> Self {
        self.new_process_group = enabled;
        self
    }

    /// Run a command on a blocking thread of the tokio runtime.
    pub async fn run_async(&self, command: Command) -> Result<ExecutionResult> {
        self.run_async_with(command, OutputSinks::new()).await
    }

    /// Like [`run_async`](Self::run_async), forwarding output to `sinks`.
    pub async fn run_async_with(
        &self,
        command: Command,
        sinks: OutputSinks,
    ) -> Result<ExecutionResult> {
        let shell = self.clone();
        tokio::task::spawn_blocking(move || shell.run_with(&command, sinks))
            .await
            .map_err(|e| ShellError::TaskJoin(e.to_string()))?
    }

    fn build(&self, command: &Command) -> Result<std::process::Command> {
        let (program, args) = command.argv.split_first().ok_or(ShellError::EmptyCommand)?;

        let mut cmd = std::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = command.working_dir.as_ref().or(self.working_dir.as_ref()) {
            if !dir.is_dir() {
                return Err(ShellError::CouldNotChangeDirectory { cwd: dir.clone() });
            }
            cmd.current_dir(dir);
        }

        // Merged over the inherited environment; command overrides win.
        cmd.envs(&self.env).envs(&command.env);

        if command.new_process_group || self.new_process_group {
            set_new_process_group(&mut cmd);
        }

        Ok(cmd)
    }
}

#[cfg(unix)]
fn set_new_process_group(cmd: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn set_new_process_group(cmd: &mut std::process::Command) {
    use std::os::windows::process::CommandExt;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

fn spawn_error(program: &str, source: std::io::Error) -> ShellError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ShellError::CommandNotFound {
            program: program.to_string(),
        }
    } else {
        ShellError::Spawn {
            program: program.to_string(),
            source,
        }
    }
}

impl Shell for LocalShell {
    type Process = ProcessHandle;
    type File = File;
    type TempDir = TempDir;

    fn spawn_with(&self, command: &Command, sinks: OutputSinks) -> Result<ProcessHandle> {
        let mut cmd = self.build(command)?;
        let program = command.program().unwrap_or_default();
        let child = cmd.spawn().map_err(|e| spawn_error(program, e))?;

        debug!(pid = child.id(), argv = ?command.argv, "spawned child");
        ProcessHandle::new(child, sinks)
    }

    fn upload_dir(&self, source: &Path, dest: &Path, ignore: &[&str]) -> Result<()> {
        files::upload_dir(source, dest, ignore)
    }

    fn upload_file(&self, source: &Path, dest: &Path) -> Result<()> {
        files::upload_file(source, dest)
    }

    fn open(&self, path: &Path, mode: &str) -> Result<File> {
        files::open(path, mode)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        files::write_file(path, contents)
    }

    fn temporary_dir(&self) -> Result<TempDir> {
        files::temporary_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected() {
        let shell = LocalShell::new();
        let err = shell.spawn(&Command::default()).unwrap_err();
        assert!(matches!(err, ShellError::EmptyCommand));
        assert!(err.is_spawn_error());
    }

    #[test]
    fn test_missing_program_is_command_not_found() {
        let shell = LocalShell::new();
        let err = shell
            .run(&Command::new(["procshell-definitely-missing-binary"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ShellError::CommandNotFound { ref program } if program == "procshell-definitely-missing-binary"
        ));
    }

    #[test]
    fn test_missing_working_dir() {
        let shell = LocalShell::new().with_working_dir("/procshell/no/such/dir");
        let err = shell.spawn(&Command::new(["pwd"])).unwrap_err();
        assert!(matches!(err, ShellError::CouldNotChangeDirectory { .. }));
    }

    #[test]
    fn test_build_applies_command_settings() {
        let shell = LocalShell::new().with_env([("SHARED", "shell"), ("BASE", "1")]);
        let command = Command::new(["env"]).env("SHARED", "command");
        let cmd = shell.build(&command).unwrap();

        let envs: HashMap<_, _> = cmd
            .get_envs()
            .map(|(k, v)| {
                (
                    k.to_string_lossy().into_owned(),
                    v.map(|v| v.to_string_lossy().into_owned()),
                )
            })
            .collect();
        assert_eq!(envs.get("SHARED"), Some(&Some("command".to_string())));
        assert_eq!(envs.get("BASE"), Some(&Some("1".to_string())));
        assert_eq!(cmd.get_program(), "env");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_working_dir_overrides_shell_default() {
        let tmp = files::temporary_dir().unwrap();
        let shell = LocalShell::new().with_working_dir("/");
        let result = shell
            .run(&Command::new(["pwd"]).working_dir(tmp.path()))
            .unwrap();

        let expected = tmp.path().canonicalize().unwrap();
        assert_eq!(
            PathBuf::from(result.output_trimmed()).canonicalize().unwrap(),
            expected
        );
    }
}
