//! Local shell integration tests.
//!
//! These tests spawn real child processes through the public API.

#![cfg(unix)]

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use procshell::{Command, LocalShell, OutputSinks, SharedBuffer, Shell, ShellError};

/// Sink that rejects every write.
struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_echo() {
    let shell = LocalShell::new();
    let result = shell.run(&Command::new(["echo", "hello"])).unwrap();

    assert_eq!(result.status(), 0);
    assert_eq!(result.stdout(), b"hello\n");
    assert_eq!(result.stderr(), b"");
    assert!(result.is_success());
}

#[test]
fn test_run_failure_raises_with_output() {
    let shell = LocalShell::new();
    let err = shell
        .run(&Command::new(["sh", "-c", "echo out; echo err 1>&2; exit 3"]))
        .unwrap_err();

    let result = err.execution_result().expect("command failed error");
    assert_eq!(result.status(), 3);
    assert_eq!(result.stdout(), b"out\n");
    assert_eq!(result.stderr(), b"err\n");
    assert!(err.to_string().starts_with("return code: 3\n"));
}

#[test]
fn test_run_failure_with_allow_error() {
    let shell = LocalShell::new();
    let result = shell
        .run(&Command::new(["sh", "-c", "echo out; echo err 1>&2; exit 3"]).allow_error(true))
        .unwrap();

    assert_eq!(result.status(), 3);
    assert_eq!(result.stdout(), b"out\n");
    assert_eq!(result.stderr(), b"err\n");
    assert!(!result.is_success());
}

#[test]
fn test_run_missing_command() {
    let shell = LocalShell::new();
    let err = shell
        .run(&Command::new(["procshell-no-such-command"]))
        .unwrap_err();
    assert!(matches!(err, ShellError::CommandNotFound { .. }));
}

#[test]
fn test_run_with_env_override() {
    let shell = LocalShell::new();
    let result = shell
        .run(&Command::new(["sh", "-c", "echo $PROCSHELL_TEST_VALUE:$PATH"]).env(
            "PROCSHELL_TEST_VALUE",
            "set",
        ))
        .unwrap();

    let text = result.output_trimmed();
    assert!(text.starts_with("set:"));
    // Inherited variables survive next to overrides.
    assert!(text.len() > "set:".len());
}

#[test]
fn test_run_in_working_dir() {
    let shell = LocalShell::new();
    let dir = shell.temporary_dir().unwrap();
    shell
        .write_file(&dir.path().join("marker.txt"), b"here")
        .unwrap();

    let result = shell
        .run(&Command::new(["cat", "marker.txt"]).working_dir(dir.path()))
        .unwrap();
    assert_eq!(result.stdout(), b"here");
}

#[cfg(target_os = "linux")]
#[test]
fn test_new_process_group() {
    let shell = LocalShell::new();
    // Field 5 of /proc/<pid>/stat is the process group id.
    let command = Command::new(["sh", "-c", "cut -d' ' -f5 /proc/$$/stat"]);

    let process = shell.spawn(&command.clone().new_process_group(true)).unwrap();
    let result = process.wait_for_result().unwrap();
    assert_eq!(result.output_trimmed(), process.pid().to_string());

    let process = shell.spawn(&command).unwrap();
    let result = process.wait_for_result().unwrap();
    assert_ne!(result.output_trimmed(), process.pid().to_string());
}

// ============================================================================
// spawn
// ============================================================================

#[test]
fn test_spawn_cat_stdin() {
    let shell = LocalShell::new();
    let process = shell.spawn(&Command::new(["cat"])).unwrap();

    assert!(process.is_running().unwrap());
    process.stdin_write(b"ping").unwrap();
    process.close_stdin().unwrap();

    let result = process.wait_for_result().unwrap();
    assert_eq!(result.stdout(), b"ping");
    assert!(!process.is_running().unwrap());
}

#[test]
fn test_spawn_does_not_apply_error_policy() {
    let shell = LocalShell::new();
    let process = shell.spawn(&Command::new(["sh", "-c", "exit 7"])).unwrap();

    let result = process.wait_for_result().unwrap();
    assert_eq!(result.status(), 7);
}

#[test]
fn test_wait_for_result_twice_is_identical() {
    let shell = LocalShell::new();
    let process = shell
        .spawn(&Command::new(["sh", "-c", "echo a; echo b 1>&2; exit 1"]))
        .unwrap();

    let first = process.wait_for_result().unwrap();
    let second = process.wait_for_result().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_wait_for_result_from_many_threads() {
    let shell = LocalShell::new();
    let process = Arc::new(shell.spawn(&Command::new(["echo", "once"])).unwrap());

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let process = Arc::clone(&process);
            thread::spawn(move || process.wait_for_result().unwrap())
        })
        .collect();
    let results: Vec<_> = waiters.into_iter().map(|t| t.join().unwrap()).collect();

    assert!(results.iter().all(|r| r == &results[0]));
    assert_eq!(results[0].stdout(), b"once\n");
}

// ============================================================================
// Capture
// ============================================================================

#[test]
fn test_large_stderr_completes() {
    let shell = LocalShell::new();
    let result = shell
        .run(&Command::new([
            "sh",
            "-c",
            "head -c 300000 /dev/zero | tr '\\0' 'e' 1>&2",
        ]))
        .unwrap();

    assert_eq!(result.stderr().len(), 300_000);
    assert!(result.stderr().iter().all(|&b| b == b'e'));
}

#[test]
fn test_tee_matches_result() {
    let shell = LocalShell::new();
    let sink = SharedBuffer::new();
    let result = shell
        .run_with(
            &Command::new(["sh", "-c", "for i in 1 2 3 4 5; do echo line $i; done"]),
            OutputSinks::new().stdout(sink.clone()),
        )
        .unwrap();

    assert_eq!(sink.contents(), result.stdout());
    assert_eq!(result.output_lines().len(), 5);
}

#[test]
fn test_failing_sink_still_captures() {
    let shell = LocalShell::new();
    let result = shell
        .run_with(
            &Command::new(["sh", "-c", "echo captured anyway"]),
            OutputSinks::new().stdout(ClosedSink),
        )
        .unwrap();

    assert_eq!(result.stdout(), b"captured anyway\n");
}

// ============================================================================
// Async
// ============================================================================

#[tokio::test]
async fn test_run_async() {
    let shell = LocalShell::new();
    let result = shell.run_async(Command::new(["echo", "async"])).await.unwrap();
    assert_eq!(result.stdout(), b"async\n");
}

#[tokio::test]
async fn test_run_async_failure() {
    let shell = LocalShell::new();
    let err = shell
        .run_async(Command::new(["sh", "-c", "exit 2"]))
        .await
        .unwrap_err();
    assert_eq!(err.execution_result().map(|r| r.status()), Some(2));
}

#[test]
fn test_run_async_block_on() {
    let shell = LocalShell::new();
    let result = tokio_test::block_on(shell.run_async(Command::new(["true"]))).unwrap();
    assert!(result.is_success());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_upload_dir_then_list() {
    let shell = LocalShell::new();
    let dir = shell.temporary_dir().unwrap();
    let src = dir.path().join("src");
    shell.write_file(&src.join("keep.txt"), b"k").unwrap();
    shell.write_file(&src.join("skip.log"), b"s").unwrap();

    let dest = dir.path().join("dest");
    shell.upload_dir(&src, &dest, &["*.log"]).unwrap();

    let result = shell
        .run(&Command::new(["ls"]).working_dir(&dest))
        .unwrap();
    assert_eq!(result.output_lines(), vec!["keep.txt"]);
}
