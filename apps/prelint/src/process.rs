//! Blocking subprocess execution with an optional deadline.
//!
//! Children are polled with `try_wait()` until they exit or the deadline
//! passes, at which point they are killed and reaped. On unix each child
//! leads its own process group and the whole group is killed. Captured
//! stdout is drained on a helper thread so a full pipe can never stall the
//! poll loop.

use crate::error::{CheckError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How the child's stdout is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stdout {
    Inherit,
    Discard,
    /// Forward to our stderr, keeping our stdout for a JSON report.
    Stderr,
}

impl Stdout {
    /// Inherit in human mode; in JSON mode stdout belongs to the report.
    pub fn for_output(output: &str) -> Self {
        if output == "json" {
            Self::Stderr
        } else {
            Self::Inherit
        }
    }

    fn stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Discard => Stdio::null(),
            Self::Stderr => Stdio::from(std::io::stderr()),
        }
    }
}

fn spawn(argv: &[String], cwd: &Path, stdout: Stdio) -> Result<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| CheckError::Usage("empty command".to_string()))?;
    debug!(program = %program, ?args, cwd = %cwd.display(), "spawning");
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CheckError::ToolNotFound {
                tool: program.clone(),
                searched: "PATH".to_string(),
            },
            _ => CheckError::io(format!("spawning {program}"), e),
        })
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
) -> Result<ExitStatus> {
    // A limit past the clock's range cannot fire, so it behaves like none.
    let Some((limit, deadline)) =
        timeout.and_then(|limit| Instant::now().checked_add(limit).map(|d| (limit, d)))
    else {
        return child
            .wait()
            .map_err(|e| CheckError::io(format!("waiting for {program}"), e));
    };
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => return Err(CheckError::io(format!("waiting for {program}"), e)),
        }
        if Instant::now() >= deadline {
            warn!(program, timeout_secs = limit.as_secs(), "deadline exceeded; killing");
            kill_tree(child);
            let _ = child.wait();
            return Err(CheckError::Subprocess {
                program: program.to_string(),
                reason: format!("timed out after {}s", limit.as_secs()),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    match i32::try_from(child.id()) {
        Ok(pid) if killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok() => {}
        _ => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Render an exit status the way operators read it in CI logs.
pub fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Run `argv` in `cwd` with stderr streamed to ours and stdout either
/// streamed or discarded. Returns the child's exit status.
pub fn run_streaming(
    argv: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
    stdout: Stdout,
) -> Result<ExitStatus> {
    let mut child = spawn(argv, cwd, stdout.stdio())?;
    wait_with_deadline(&mut child, &argv[0], timeout)
}

/// Like [`run_streaming`] but treats a non-zero exit as `Subprocess`.
pub fn run_checked(
    argv: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
    stdout: Stdout,
) -> Result<()> {
    let status = run_streaming(argv, cwd, timeout, stdout)?;
    if status.success() {
        Ok(())
    } else {
        Err(CheckError::Subprocess {
            program: argv[0].clone(),
            reason: describe_status(&status),
        })
    }
}

/// Run `argv` and capture its stdout. A non-zero exit is `Subprocess`.
pub fn run_captured(argv: &[String], cwd: &Path, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let mut child = spawn(argv, cwd, Stdio::piped())?;
    let reader = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf).map(|_| buf)
        })
    });
    let status = wait_with_deadline(&mut child, &argv[0], timeout)?;
    let output = match reader {
        Some(handle) => match handle.join() {
            Ok(Ok(buf)) => buf,
            Ok(Err(e)) => return Err(CheckError::io(format!("reading {} output", argv[0]), e)),
            Err(_) => Vec::new(),
        },
        None => Vec::new(),
    };
    if !status.success() {
        return Err(CheckError::Subprocess {
            program: argv[0].clone(),
            reason: describe_status(&status),
        });
    }
    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn test_run_captured_returns_stdout() {
        let dir = tempdir().unwrap();
        let out = run_captured(&sh("printf 'a\\0b\\0'"), dir.path(), None).unwrap();
        assert_eq!(out, b"a\0b\0");
    }

    #[test]
    fn test_nonzero_exit_is_subprocess_failure() {
        let dir = tempdir().unwrap();
        let err = run_checked(&sh("exit 3"), dir.path(), None, Stdout::Discard).unwrap_err();
        match err {
            CheckError::Subprocess { reason, .. } => assert_eq!(reason, "exit status 3"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_deadline_kills_hung_child() {
        let dir = tempdir().unwrap();
        let started = Instant::now();
        let err = run_streaming(
            &sh("sleep 30"),
            dir.path(),
            Some(Duration::from_millis(200)),
            Stdout::Discard,
        )
        .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_deadline_kills_background_grandchildren() {
        let dir = tempdir().unwrap();
        let late = dir.path().join("late");
        let script = format!("(sleep 1; echo late > '{}') & wait", late.display());
        let err = run_streaming(
            &sh(&script),
            dir.path(),
            Some(Duration::from_millis(200)),
            Stdout::Discard,
        )
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        thread::sleep(Duration::from_millis(1500));
        assert!(!late.exists());
    }

    #[test]
    fn test_unrepresentable_deadline_waits_without_one() {
        let dir = tempdir().unwrap();
        let status = run_streaming(
            &sh("exit 0"),
            dir.path(),
            Some(Duration::from_secs(u64::MAX)),
            Stdout::Discard,
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_json_output_routes_child_stdout_away() {
        assert_eq!(Stdout::for_output("json"), Stdout::Stderr);
        assert_eq!(Stdout::for_output("human"), Stdout::Inherit);
    }

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let dir = tempdir().unwrap();
        let argv = vec!["prelint-definitely-not-installed".to_string()];
        let err = run_streaming(&argv, dir.path(), None, Stdout::Discard).unwrap_err();
        assert!(matches!(err, CheckError::ToolNotFound { .. }));
    }

    #[test]
    fn test_empty_command_is_usage_error() {
        let dir = tempdir().unwrap();
        let err = run_streaming(&[], dir.path(), None, Stdout::Discard).unwrap_err();
        assert!(matches!(err, CheckError::Usage(_)));
    }
}
