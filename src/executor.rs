//! Bounded-time execution of program invocations
//!
//! Each call spawns exactly one `sh -c <command>` child in its own process
//! group, captures stdout and stderr, and waits for termination or for the
//! configured deadline, whichever comes first. On expiry the whole process
//! group receives `SIGKILL`, so descendants started by the command do not
//! outlive the test.
//!
//! An interrupt flag, when attached, is watched while the child runs; once
//! it is set the group is killed the same way.
//!
//! Captured bytes are decoded lossily: invalid UTF-8 sequences become
//! U+FFFD rather than failing the test.

use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::constants::{SHELL_COMMAND_FLAG, SHELL_PROGRAM};
use crate::models::{CapturedOutcome, FailureCause};
use crate::template::ProgramTemplate;

/// Runs formatted invocations under an optional wall-clock timeout
pub struct Executor {
    runtime: Runtime,
    timeout: Option<Duration>,
    interrupted: Option<Arc<AtomicBool>>,
}

/// How often a running child checks the interrupt flag
const INTERRUPT_POLL: Duration = Duration::from_millis(25);

enum Wait {
    Finished(io::Result<(Vec<u8>, Vec<u8>, ExitStatus)>),
    TimedOut(Duration),
    Interrupted,
}

impl Executor {
    /// Create an executor; `timeout_ms = None` waits indefinitely
    pub fn new(timeout_ms: Option<u64>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            timeout: timeout_ms.map(Duration::from_millis),
            interrupted: None,
        })
    }

    /// Kill the running child's process group once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(flag);
        self
    }

    /// Run the template against one test path and capture the outcome
    pub fn run(&self, template: &ProgramTemplate, test_path: &Path) -> CapturedOutcome {
        let command = template.format(test_path);
        self.runtime.block_on(self.run_command(command))
    }

    async fn run_command(&self, command: String) -> CapturedOutcome {
        debug!(%command, "spawning");

        let mut shell = std::process::Command::new(SHELL_PROGRAM);
        shell
            .arg(SHELL_COMMAND_FLAG)
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let spawned = Command::from(shell).kill_on_drop(true).spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                return CapturedOutcome::Failed {
                    command,
                    cause: FailureCause::LaunchError(err.to_string()),
                }
            }
        };

        let pid = child.id();
        let waited = tokio::select! {
            collected = collect_output(&mut child) => Wait::Finished(collected),
            limit = deadline(self.timeout) => Wait::TimedOut(limit),
            _ = interrupt(self.interrupted.as_deref()) => Wait::Interrupted,
        };

        let collected = match waited {
            Wait::Finished(collected) => collected,
            Wait::TimedOut(limit) => {
                terminate_group(pid, &mut child).await;
                let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                warn!(%command, after_ms, "invocation timed out, process group killed");
                return CapturedOutcome::Failed {
                    command,
                    cause: FailureCause::Timeout { after_ms },
                };
            }
            Wait::Interrupted => {
                terminate_group(pid, &mut child).await;
                warn!(%command, "run interrupted, process group killed");
                return CapturedOutcome::Failed {
                    command,
                    cause: FailureCause::Interrupted,
                };
            }
        };

        match collected {
            Ok((stdout, stderr, status)) => CapturedOutcome::Completed {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                returncode: returncode_of(status),
                command,
            },
            Err(err) => CapturedOutcome::Failed {
                command,
                cause: FailureCause::LaunchError(format!("failed to collect output: {}", err)),
            },
        }
    }
}

/// Resolves when the limit elapses; never without a limit
async fn deadline(limit: Option<Duration>) -> Duration {
    match limit {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

/// Resolves once the flag is set; never without a flag
async fn interrupt(flag: Option<&AtomicBool>) {
    let Some(flag) = flag else {
        return std::future::pending().await;
    };
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

/// Exit code, or the negated signal number for signal-terminated processes
fn returncode_of(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| status.signal().map_or(-1, |signal| -signal))
}

async fn collect_output(child: &mut Child) -> io::Result<(Vec<u8>, Vec<u8>, ExitStatus)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    tokio::try_join!(read_all(stdout), read_all(stderr), child.wait())
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

/// Kill the child's process group, then reap the child itself
async fn terminate_group(pid: Option<u32>, child: &mut Child) {
    if let Some(raw) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        // The child leads its own group, so its pid is the group id
        if let Err(err) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
            debug!(pid = raw, %err, "killpg failed");
        }
    }
    if let Err(err) = child.kill().await {
        debug!(%err, "child already exited");
    }
}
