//! Timeout-bounded external process execution.
//!
//! Every collaborator the engine shells out to (browser `--version`,
//! `update-desktop-database`, `dpkg-query`, `cec-client`, ...) goes through
//! [`run_with_timeout`] so a hung tool can never stall a run.

use crate::config::ProcessConfig;
use crate::error::{KioskError, Result};
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// First non-empty line of stdout, falling back to stderr.
    pub fn first_line(&self) -> Option<String> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }
}

/// Render a command as `program arg1 arg2` for logs and errors.
pub fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, killing it if it exceeds `timeout`.
///
/// Returns `ToolAbsent` when the program cannot be spawned because it does
/// not exist, `Timeout` when it had to be killed, and the captured output
/// otherwise (including non-zero exits; callers decide what failure means).
pub fn run_with_timeout(
    mut command: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let description = describe(&command);
    debug!("Running `{}` (timeout {:?})", description, timeout);

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn(&mut command).map_err(|e| spawn_error(&command, &description, e))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        if let Err(e) = pipe.write_all(input) {
            warn!("Failed to write stdin of `{}`: {}", description, e);
        }
        // pipe dropped here so the child sees EOF
    }

    let stdout_rx = capture(child.stdout.take());
    let stderr_rx = capture(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill(&mut child, &description);
                    return Err(KioskError::Timeout {
                        command: description,
                        timeout,
                    });
                }
                thread::sleep(ProcessConfig::POLL_INTERVAL);
            }
            Err(e) => {
                kill(&mut child, &description);
                return Err(KioskError::CommandFailed {
                    command: description,
                    message: format!("Failed to check process status: {}", e),
                });
            }
        }
    };

    // Grandchildren may keep the pipes open; never wait on them past the deadline.
    let grace = timeout.saturating_sub(start.elapsed()).max(Duration::from_millis(200));
    let stdout = stdout_rx.recv_timeout(grace).unwrap_or_default();
    let stderr = stderr_rx.recv_timeout(grace).unwrap_or_default();

    debug!("`{}` exited with {}", description, status);

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Run a command attached to the current terminal and wait for it.
///
/// Used for interactive tools; there is deliberately no timeout.
pub fn run_attached(mut command: Command) -> Result<ExitStatus> {
    let description = describe(&command);
    debug!("Running attached `{}`", description);

    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(&command, &description, e))
}

/// Spawn, retrying briefly while the executable is still open for writing
/// (ETXTBSY) by a racing fork elsewhere in the process.
fn spawn(command: &mut Command) -> std::io::Result<Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if is_text_busy(&e) && attempts < 5 => {
                attempts += 1;
                thread::sleep(ProcessConfig::POLL_INTERVAL);
            }
            other => return other,
        }
    }
}

#[cfg(unix)]
fn is_text_busy(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::ETXTBSY as i32)
}

#[cfg(not(unix))]
fn is_text_busy(_err: &std::io::Error) -> bool {
    false
}

fn spawn_error(command: &Command, description: &str, err: std::io::Error) -> KioskError {
    if err.kind() == std::io::ErrorKind::NotFound {
        KioskError::ToolAbsent {
            tool: command.get_program().to_string_lossy().into_owned(),
        }
    } else {
        KioskError::CommandFailed {
            command: description.to_string(),
            message: err.to_string(),
        }
    }
}

fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
    }
    rx
}

fn kill(child: &mut Child, description: &str) {
    warn!("Killing `{}`", description);
    if let Err(e) = child.kill() {
        debug!("kill failed for `{}`: {}", description, e);
    }
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn test_captures_output() {
        let output =
            run_with_timeout(sh("echo hello; echo oops >&2"), None, Duration::from_secs(5))
                .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.first_line().as_deref(), Some("hello"));
    }

    #[test]
    fn test_nonzero_exit_is_output_not_error() {
        let output = run_with_timeout(sh("exit 3"), None, Duration::from_secs(5)).unwrap();
        assert!(!output.success());
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn test_feeds_stdin() {
        let output = run_with_timeout(sh("cat"), Some(b"scan\n"), Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout, "scan\n");
    }

    #[test]
    fn test_times_out() {
        let start = Instant::now();
        let result = run_with_timeout(sh("sleep 10"), None, Duration::from_millis(300));

        assert!(matches!(result, Err(KioskError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program_is_tool_absent() {
        let result = run_with_timeout(
            Command::new("pikiosk-definitely-not-a-real-binary"),
            None,
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(KioskError::ToolAbsent { .. })));
    }

    #[test]
    fn test_describe() {
        let mut command = Command::new("cec-client");
        command.args(["-s", "-d", "1"]);
        assert_eq!(describe(&command), "cec-client -s -d 1");
    }
}
