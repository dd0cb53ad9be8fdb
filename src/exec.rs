//! Command execution layer.
//!
//! The watch loop talks to a [`CommandRunner`] instead of spawning processes
//! itself. Production code uses [`ShellRunner`], which runs the command
//! through the platform shell with a timeout; tests swap in a recorder that
//! never touches the OS.

use std::fmt;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::WatchConfig;
use crate::core::EventKind;

/// Pick the command for an event: the event-specific entry, else the
/// generic fallback, else nothing.
pub fn resolve_command(kind: EventKind, config: &WatchConfig) -> Option<&str> {
    config.commands.resolve(kind)
}

/// How a dispatched command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    /// Non-zero exit. `code` is `None` when the process died from a signal.
    Failed { code: Option<i32> },
    /// The timeout elapsed; the process was left running.
    TimedOut { after: Duration },
    /// The process could not be started or waited on.
    LaunchError(String),
}

impl ExecutionOutcome {
    /// Log message for a command dispatched for `label` ("create", "initial
    /// run", ...).
    pub fn describe(&self, label: &str) -> String {
        match self {
            ExecutionOutcome::Success => format!("{} command succeeded", label),
            ExecutionOutcome::Failed { code: Some(code) } => {
                format!("{} command failed (exit {})", label, code)
            }
            ExecutionOutcome::Failed { code: None } => {
                format!("{} command failed (terminated by signal)", label)
            }
            ExecutionOutcome::TimedOut { after } => {
                format!("Command timed out after {}s", after.as_secs())
            }
            ExecutionOutcome::LaunchError(err) => format!("Command error: {}", err),
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Success => write!(f, "success"),
            ExecutionOutcome::Failed { code: Some(code) } => write!(f, "exit {}", code),
            ExecutionOutcome::Failed { code: None } => write!(f, "signal"),
            ExecutionOutcome::TimedOut { after } => write!(f, "timed out after {:?}", after),
            ExecutionOutcome::LaunchError(err) => write!(f, "launch error: {}", err),
        }
    }
}

/// Trait abstracting how a resolved command is executed.
///
/// The returned future resolves once the command has finished or given up;
/// the watch loop awaits it before doing anything else.
pub trait CommandRunner: Send {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>>;
}

/// Runs commands through `sh -c` (`cmd /C` on Windows).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.command_timeout)
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        }
    }

    async fn run_inner(&self, command: &str) -> ExecutionOutcome {
        let mut cmd = Self::shell_command(command);
        // No kill_on_drop: a timed-out child is abandoned, not killed.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::debug!(command, error = %err, "failed to spawn command");
                return ExecutionOutcome::LaunchError(err.to_string());
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return ExecutionOutcome::LaunchError(err.to_string()),
            Err(_) => {
                tracing::debug!(command, timeout = ?self.timeout, "command timed out");
                return ExecutionOutcome::TimedOut {
                    after: self.timeout,
                };
            }
        };

        echo_output(&output.stdout, &output.stderr);

        if output.status.success() {
            ExecutionOutcome::Success
        } else {
            ExecutionOutcome::Failed {
                code: output.status.code(),
            }
        }
    }
}

/// Surface captured output: stdout to stdout, stderr to stderr.
fn echo_output(stdout: &[u8], stderr: &[u8]) {
    if !stdout.is_empty() {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(stdout);
        let _ = out.flush();
    }
    if !stderr.is_empty() {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(stderr);
        let _ = err.flush();
    }
}

impl CommandRunner for ShellRunner {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        Box::pin(self.run_inner(command))
    }
}
