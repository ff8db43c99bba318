//! Running installer processes.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ExecutionError;
use crate::probe::is_elevated;
use crate::BoxFuture;

/// Exit code for a clean install.
pub const EXIT_SUCCESS: i32 = 0;

/// Windows installer convention: success, reboot required.
pub const EXIT_REBOOT_REQUIRED: i32 = 3010;

/// Windows installer convention: success, reboot started.
pub const EXIT_REBOOT_INITIATED: i32 = 1641;

/// How an installer process ended, when it ended well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub code: i32,
}

impl ExitOutcome {
    /// True when the installer succeeded but needs a reboot to finish.
    pub fn reboot_required(&self) -> bool {
        self.code == EXIT_REBOOT_REQUIRED || self.code == EXIT_REBOOT_INITIATED
    }
}

/// Runs an installer to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Succeeds only for exit codes that mean "installed". `timeout` bounds
    /// the wait; `cancel` ends it early with [`ExecutionError::Cancelled`].
    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [String],
        elevated: bool,
        timeout: Duration,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ExitOutcome, ExecutionError>>;
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// Cancellation stops the wait but leaves the installer running unless the
/// runner was built with [`with_hard_cancel`](Self::with_hard_cancel).
/// A process that outlives the timeout is always killed.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    elevation_prefix: Vec<String>,
    hard_cancel: bool,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            elevation_prefix: default_elevation_prefix(),
            hard_cancel: false,
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command prepended to elevated runs when the process is not already
    /// privileged, e.g. `["sudo", "-n"]`. Empty disables the prefix.
    pub fn with_elevation_prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elevation_prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    /// Kill the installer when the run is cancelled.
    pub fn with_hard_cancel(mut self, hard_cancel: bool) -> Self {
        self.hard_cancel = hard_cancel;
        self
    }

    pub fn hard_cancel(&self) -> bool {
        self.hard_cancel
    }

    fn build_command(&self, program: &Path, args: &[String], elevated: bool) -> Command {
        let mut command = match self.elevation_prefix.split_first() {
            Some((first, rest)) if elevated && !is_elevated() => {
                let mut c = Command::new(first);
                c.args(rest).arg(program);
                c
            }
            _ => Command::new(program),
        };
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    async fn run_process(
        &self,
        program: &Path,
        args: &[String],
        elevated: bool,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExitOutcome, ExecutionError> {
        let name = program.display().to_string();
        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        ensure_executable(program);
        let mut child = self
            .build_command(program, args, elevated)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: name.clone(),
                source,
            })?;
        debug!(program = %name, pid = ?child.id(), elevated, "installer started");

        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => Waited::Cancelled,
            result = tokio::time::timeout(timeout, child.wait()) => match result {
                Ok(status) => Waited::Exited(status),
                Err(_) => Waited::TimedOut,
            },
        };

        match waited {
            Waited::Exited(status) => {
                let status = status.map_err(|source| ExecutionError::Wait {
                    program: name.clone(),
                    source,
                })?;
                exit_outcome(&name, status)
            }
            Waited::TimedOut => {
                warn!(program = %name, timeout_secs = timeout.as_secs(), "installer timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!(program = %name, error = %e, "failed to kill installer");
                }
                Err(ExecutionError::Timeout {
                    program: name,
                    timeout_secs: timeout.as_secs(),
                })
            }
            Waited::Cancelled => {
                if self.hard_cancel {
                    info!(program = %name, "cancelled, killing installer");
                    if let Err(e) = child.kill().await {
                        warn!(program = %name, error = %e, "failed to kill installer");
                    }
                } else {
                    info!(program = %name, pid = ?child.id(), "cancelled, installer left running");
                }
                Err(ExecutionError::Cancelled)
            }
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [String],
        elevated: bool,
        timeout: Duration,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ExitOutcome, ExecutionError>> {
        Box::pin(self.run_process(program, args, elevated, timeout, cancel))
    }
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

fn exit_outcome(program: &str, status: ExitStatus) -> Result<ExitOutcome, ExecutionError> {
    match status.code() {
        Some(code) if code == EXIT_SUCCESS => Ok(ExitOutcome { code }),
        Some(code) if code == EXIT_REBOOT_REQUIRED || code == EXIT_REBOOT_INITIATED => {
            info!(program, code, "installer finished, reboot required");
            Ok(ExitOutcome { code })
        }
        Some(code) => Err(ExecutionError::ExitCode {
            program: program.to_string(),
            code,
        }),
        None => Err(ExecutionError::Terminated {
            program: program.to_string(),
        }),
    }
}

#[cfg(unix)]
fn default_elevation_prefix() -> Vec<String> {
    vec!["sudo".to_string(), "-n".to_string()]
}

/// Windows installers request elevation themselves.
#[cfg(not(unix))]
fn default_elevation_prefix() -> Vec<String> {
    Vec::new()
}

/// Downloaded payloads arrive without the execute bit.
#[cfg(unix)]
fn ensure_executable(program: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::metadata(program) else {
        return;
    };
    let mut permissions = metadata.permissions();
    if metadata.is_file() && permissions.mode() & 0o111 == 0 {
        permissions.set_mode(permissions.mode() | 0o755);
        if let Err(e) = std::fs::set_permissions(program, permissions) {
            debug!(program = %program.display(), error = %e, "could not mark payload executable");
        }
    }
}

#[cfg(not(unix))]
fn ensure_executable(_program: &Path) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    const SH: &str = "/bin/sh";

    fn shell(body: &str) -> Vec<String> {
        vec!["-c".to_string(), body.to_string()]
    }

    fn runner() -> ProcessRunner {
        ProcessRunner::new().with_elevation_prefix(Vec::<String>::new())
    }

    #[tokio::test]
    async fn test_zero_exit_succeeds() {
        let outcome = runner()
            .run(
                Path::new(SH),
                &shell("exit 0"),
                false,
                Duration::from_secs(10),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.code, 0);
        assert!(!outcome.reboot_required());
    }

    #[test]
    fn test_reboot_codes() {
        assert!(ExitOutcome { code: EXIT_REBOOT_REQUIRED }.reboot_required());
        assert!(ExitOutcome { code: EXIT_REBOOT_INITIATED }.reboot_required());
        assert!(!ExitOutcome { code: EXIT_SUCCESS }.reboot_required());
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let result = runner()
            .run(
                Path::new(SH),
                &shell("exit 3"),
                false,
                Duration::from_secs(10),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ExecutionError::ExitCode { code: 3, .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = runner()
            .run(
                Path::new(SH),
                &shell("sleep 30"),
                false,
                Duration::from_millis(200),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ExecutionError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_stops_waiting() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = runner()
            .with_hard_cancel(true)
            .run(
                Path::new(SH),
                &shell("sleep 30"),
                false,
                Duration::from_secs(60),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(ExecutionError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = runner()
            .run(
                Path::new("/nonexistent/setup.sh"),
                &[],
                false,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }

    #[test]
    fn test_elevation_prefix_applied() {
        let runner = ProcessRunner::new().with_elevation_prefix(["sudo", "-n"]);
        let command = runner.build_command(Path::new("/tmp/setup"), &shell("x"), true);
        let program = command.as_std().get_program().to_string_lossy().to_string();
        if is_elevated() {
            assert_eq!(program, "/tmp/setup");
        } else {
            assert_eq!(program, "sudo");
        }

        let plain = runner.build_command(Path::new("/tmp/setup"), &[], false);
        assert_eq!(plain.as_std().get_program(), "/tmp/setup");
    }
}
