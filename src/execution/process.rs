//! Handle to a spawned child process.

use std::io::{self, Write};
use std::process::{Child, ChildStdin, ExitStatus};
use std::sync::{Mutex, TryLockError};

use tracing::debug;

use super::capture::{OutputSink, OutputSinks, OutputSource, StreamCapture};
use super::result::ExecutionResult;
use crate::error::ShellError;
use crate::Result;

/// One in-flight or completed child process.
///
/// The handle owns the child and a [`StreamCapture`] draining its stdout and
/// stderr. [`wait_for_result`](Self::wait_for_result) computes the outcome
/// once and caches it; concurrent callers are serialized on the cache lock.
pub struct ProcessHandle {
    pid: u32,
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    capture: Mutex<StreamCapture>,
    result: Mutex<Option<ExecutionResult>>,
}

impl ProcessHandle {
    /// Wrap a freshly spawned child.
    ///
    /// Its stdout and stderr, when piped, are handed to a new capture
    /// together with the matching sinks. A stream that was not piped drains
    /// as empty.
    pub fn new(mut child: Child, sinks: OutputSinks) -> Result<Self> {
        let stdout: OutputSource = match child.stdout.take() {
            Some(stream) => Box::new(stream),
            None => Box::new(io::empty()),
        };
        let stderr: OutputSource = match child.stderr.take() {
            Some(stream) => Box::new(stream),
            None => Box::new(io::empty()),
        };
        let capture = StreamCapture::new([(stdout, sinks.stdout), (stderr, sinks.stderr)])?;

        Ok(Self {
            pid: child.id(),
            stdin: Mutex::new(child.stdin.take()),
            child: Mutex::new(child),
            capture: Mutex::new(capture),
            result: Mutex::new(None),
        })
    }

    /// OS process id of the child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Check whether the child is still running, without blocking.
    ///
    /// Repeatable: the exit status stays available for a later wait.
    pub fn is_running(&self) -> Result<bool> {
        match self.child.try_lock() {
            Ok(mut child) => Ok(child.try_wait()?.is_none()),
            // Held only while a waiter blocks on the child, which therefore
            // has not been reaped yet.
            Err(TryLockError::WouldBlock) => Ok(true),
            Err(TryLockError::Poisoned(_)) => Err(ShellError::LockPoisoned),
        }
    }

    /// Write bytes to the child's standard input.
    pub fn stdin_write(&self, bytes: &[u8]) -> Result<()> {
        let mut stdin = self.stdin.lock().map_err(|_| ShellError::LockPoisoned)?;
        let stream = stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"))?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    /// Close the child's standard input, signalling end of input.
    pub fn close_stdin(&self) -> Result<()> {
        let mut stdin = self.stdin.lock().map_err(|_| ShellError::LockPoisoned)?;
        drop(stdin.take());
        Ok(())
    }

    /// Wait for the child to finish and return its result.
    ///
    /// The first call drains both output streams, reaps the child and caches
    /// the result. Later calls return the cached value.
    pub fn wait_for_result(&self) -> Result<ExecutionResult> {
        let mut cached = self.result.lock().map_err(|_| ShellError::LockPoisoned)?;
        if let Some(result) = cached.as_ref() {
            return Ok(result.clone());
        }

        let result = self.generate_result()?;
        *cached = Some(result.clone());
        Ok(result)
    }

    fn generate_result(&self) -> Result<ExecutionResult> {
        let captured = self
            .capture
            .lock()
            .map_err(|_| ShellError::LockPoisoned)?
            .wait()?;
        let (status, residual_stdout, residual_stderr) = self.reap()?;

        let mut captured = captured.into_iter();
        let stdout = prefer_captured(captured.next().unwrap_or_default(), residual_stdout);
        let stderr = prefer_captured(captured.next().unwrap_or_default(), residual_stderr);

        Ok(ExecutionResult::new(status, stdout, stderr))
    }

    /// Final join: collect whatever is still attached to the child, then
    /// block until it exits.
    fn reap(&self) -> Result<(i32, Vec<u8>, Vec<u8>)> {
        self.close_stdin()?;

        let mut child = self.child.lock().map_err(|_| ShellError::LockPoisoned)?;
        let residual: Vec<(OutputSource, Option<OutputSink>)> = [
            child.stdout.take().map(|s| Box::new(s) as OutputSource),
            child.stderr.take().map(|s| Box::new(s) as OutputSource),
        ]
        .into_iter()
        .map(|source| {
            let source = source.unwrap_or_else(|| Box::new(io::empty()) as OutputSource);
            (source, None)
        })
        .collect();
        let mut residual = StreamCapture::new(residual)?.wait()?.into_iter();

        let status = child.wait()?;
        let code = exit_code(status);
        debug!(pid = self.pid, status = code, "child reaped");

        Ok((
            code,
            residual.next().unwrap_or_default(),
            residual.next().unwrap_or_default(),
        ))
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Captured output is authoritative; the residual join only fills in for a
/// stream the capture never saw any bytes on.
fn prefer_captured(captured: Vec<u8>, residual: Vec<u8>) -> Vec<u8> {
    if captured.is_empty() {
        residual
    } else {
        captured
    }
}

/// Exit code of the child, or the negated signal number if it was killed.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefer_captured_when_non_empty() {
        assert_eq!(prefer_captured(b"live".to_vec(), b"join".to_vec()), b"live");
    }

    #[test]
    fn test_prefer_residual_when_capture_empty() {
        assert_eq!(prefer_captured(Vec::new(), b"join".to_vec()), b"join");
        assert!(prefer_captured(Vec::new(), Vec::new()).is_empty());
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::execution::SharedBuffer;
        use std::process::{Command, Stdio};
        use std::sync::Arc;
        use std::thread;
        use std::time::{Duration, Instant};

        fn spawn(argv: &[&str], sinks: OutputSinks) -> ProcessHandle {
            let child = Command::new(argv[0])
                .args(&argv[1..])
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .unwrap();
            ProcessHandle::new(child, sinks).unwrap()
        }

        #[test]
        fn test_wait_for_result_echo() {
            let handle = spawn(&["echo", "hello"], OutputSinks::new());
            let result = handle.wait_for_result().unwrap();

            assert_eq!(result.status(), 0);
            assert_eq!(result.stdout(), b"hello\n");
            assert!(result.stderr().is_empty());
        }

        #[test]
        fn test_wait_for_result_is_memoized() {
            let handle = spawn(
                &["sh", "-c", "echo out; echo err 1>&2; exit 3"],
                OutputSinks::new(),
            );

            let first = handle.wait_for_result().unwrap();
            let second = handle.wait_for_result().unwrap();
            assert_eq!(first, second);
            assert_eq!(first.status(), 3);
        }

        #[test]
        fn test_concurrent_waiters_see_one_result() {
            let handle = Arc::new(spawn(&["sh", "-c", "echo shared"], OutputSinks::new()));

            let waiters: Vec<_> = (0..4)
                .map(|_| {
                    let handle = Arc::clone(&handle);
                    thread::spawn(move || handle.wait_for_result().unwrap())
                })
                .collect();

            for waiter in waiters {
                let result = waiter.join().unwrap();
                assert_eq!(result.stdout(), b"shared\n");
            }
        }

        #[test]
        fn test_stdin_round_trip_through_cat() {
            let handle = spawn(&["cat"], OutputSinks::new());
            handle.stdin_write(b"ping").unwrap();
            handle.close_stdin().unwrap();

            let result = handle.wait_for_result().unwrap();
            assert_eq!(result.stdout(), b"ping");
            assert!(result.is_success());
        }

        #[test]
        fn test_stdin_write_after_close_fails() {
            let handle = spawn(&["cat"], OutputSinks::new());
            handle.close_stdin().unwrap();

            let err = handle.stdin_write(b"late").unwrap_err();
            assert!(matches!(err, ShellError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
            handle.wait_for_result().unwrap();
        }

        #[test]
        fn test_is_running_is_repeatable() {
            let handle = spawn(&["cat"], OutputSinks::new());
            assert!(handle.is_running().unwrap());
            assert!(handle.is_running().unwrap());

            handle.close_stdin().unwrap();
            let deadline = Instant::now() + Duration::from_secs(5);
            while handle.is_running().unwrap() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            assert!(!handle.is_running().unwrap());
            assert!(!handle.is_running().unwrap());

            // Liveness probes must not have consumed the exit status.
            assert!(handle.wait_for_result().unwrap().is_success());
        }

        #[test]
        fn test_large_stderr_does_not_deadlock() {
            // Far more than a pipe buffer, written to stderr only.
            let handle = spawn(
                &["sh", "-c", "head -c 1000000 /dev/zero 1>&2; echo done"],
                OutputSinks::new(),
            );
            let result = handle.wait_for_result().unwrap();

            assert_eq!(result.stderr().len(), 1_000_000);
            assert_eq!(result.stdout(), b"done\n");
        }

        #[test]
        fn test_sinks_receive_live_output() {
            let out = SharedBuffer::new();
            let err = SharedBuffer::new();
            let handle = spawn(
                &["sh", "-c", "printf 'a\\nb\\n'; printf 'oops' 1>&2"],
                OutputSinks::new().stdout(out.clone()).stderr(err.clone()),
            );

            let result = handle.wait_for_result().unwrap();
            assert_eq!(out.contents(), result.stdout());
            assert_eq!(err.contents(), result.stderr());
            assert_eq!(result.stdout(), b"a\nb\n");
        }

        #[test]
        fn test_unpiped_streams_yield_empty_output() {
            let child = Command::new("true")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .unwrap();
            let handle = ProcessHandle::new(child, OutputSinks::new()).unwrap();

            let result = handle.wait_for_result().unwrap();
            assert!(result.is_success());
            assert!(result.stdout().is_empty());
            assert!(handle.stdin_write(b"x").is_err());
        }

        #[test]
        fn test_signal_status_is_negative() {
            let handle = spawn(&["sh", "-c", "kill -9 $$"], OutputSinks::new());
            assert_eq!(handle.wait_for_result().unwrap().status(), -9);
        }
    }
}
