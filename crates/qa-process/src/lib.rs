//! Blocking subprocess runner (spec §4.2).
//!
//! No shell is ever invoked; arguments are passed to the child verbatim.
//! Timeouts are enforced by polling `try_wait` rather than async cancellation,
//! so this crate has no executor dependency — every call here blocks the
//! calling thread, which is the point: the scheduler puts one of these on
//! each worker thread (spec §5).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use qa_core::{AppError, AppResult};

/// Exit code synthesized when a subprocess is killed for exceeding its timeout.
pub const TIMEOUT_RETURNCODE: i32 = 124;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Result of one subprocess invocation (spec §4.2).
#[derive(Debug, Clone)]
pub struct CompletedProcess {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

/// Resolve `cmd[0]` to an absolute path: pass absolute paths through, otherwise
/// search `PATH`. Returns [`AppError::MissingExecutable`] when unresolvable.
pub fn resolve_executable(program: &str) -> AppResult<PathBuf> {
    let as_path = Path::new(program);
    if as_path.is_absolute() {
        return Ok(as_path.to_path_buf());
    }
    which::which(program).map_err(|_| AppError::MissingExecutable(program.to_string()))
}

/// Run `argv` to completion, never invoking a shell, with stdin disabled.
///
/// On timeout the child's process group is killed, the zombie is reaped, and
/// a synthetic `returncode = 124` is returned with a marker appended to
/// stderr — this function never raises for a timeout or a nonzero exit; that
/// classification is the caller's job (spec §4.7 step 6).
pub fn run(
    argv: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    timeout: Option<Duration>,
) -> AppResult<CompletedProcess> {
    let Some((program, args)) = argv.split_first() else {
        return Err(AppError::PreparationError {
            tool: String::new(),
            action: String::new(),
            message: "empty command".to_string(),
        });
    };

    let executable = resolve_executable(program)?;

    let mut command = Command::new(&executable);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_clear()
        .envs(env);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let start = Instant::now();
    let mut child = command.spawn().map_err(|err| AppError::PreparationError {
        tool: program.clone(),
        action: String::new(),
        message: format!("failed to spawn: {err}"),
    })?;

    let Some(timeout) = timeout else {
        let output = child
            .wait_with_output()
            .map_err(|err| AppError::PreparationError {
                tool: program.clone(),
                action: String::new(),
                message: format!("failed to wait: {err}"),
            })?;
        return Ok(CompletedProcess {
            returncode: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: start.elapsed(),
            timed_out: false,
        });
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut stdout = String::new();
                let mut stderr = String::new();
                if let Some(mut out) = child.stdout.take() {
                    use std::io::Read;
                    let _ = out.read_to_string(&mut stdout);
                }
                if let Some(mut err) = child.stderr.take() {
                    use std::io::Read;
                    let _ = err.read_to_string(&mut stderr);
                }
                return Ok(CompletedProcess {
                    returncode: status.code().unwrap_or(-1),
                    stdout,
                    stderr,
                    duration: start.elapsed(),
                    timed_out: false,
                });
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process_group(&mut child);
                    let _ = child.wait();
                    let mut stderr = String::new();
                    if let Some(mut err) = child.stderr.take() {
                        use std::io::Read;
                        let _ = err.read_to_string(&mut stderr);
                    }
                    stderr.push_str(&format!(
                        "\n[timed out after {}s]",
                        timeout.as_secs()
                    ));
                    return Ok(CompletedProcess {
                        returncode: TIMEOUT_RETURNCODE,
                        stdout: String::new(),
                        stderr,
                        duration: start.elapsed(),
                        timed_out: true,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                return Err(AppError::PreparationError {
                    tool: program.clone(),
                    action: String::new(),
                    message: format!("failed to poll child: {err}"),
                });
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(child: &mut std::process::Child) {
    // SAFETY: kill() is async-signal-safe; negative pid targets the group
    // created by process_group(0) at spawn time.
    unsafe {
        libc::kill(-(child.id() as i32), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut std::process::Child) {
    let _ = child.kill();
}
