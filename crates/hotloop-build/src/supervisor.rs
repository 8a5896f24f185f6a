//! Supervision of the long-running program a build produces.
//!
//! At most one child is tracked. Stopping it sends an interrupt, waits up
//! to the grace period, then kills and reaps it. Restarts are serialized by
//! the lock around the child slot, so a restart that arrives during another
//! restart's grace period waits instead of spawning a second instance.

use crate::BuildError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Grace period used when none is configured.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How to start the supervised program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Program to run
    pub program: PathBuf,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
}

impl LaunchSpec {
    /// Run `program` with no arguments in `cwd`.
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Set arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// How a tracked process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited within the grace period after the interrupt
    Graceful,
    /// Had to be killed
    Forced,
    /// Had already exited before we asked
    AlreadyExited,
}

/// Owns zero or one running instance of the target program.
pub struct ProcessSupervisor {
    spec: LaunchSpec,
    grace: Duration,
    current: Mutex<Option<Child>>,
}

impl ProcessSupervisor {
    /// Create a supervisor; nothing runs until [`restart`](Self::restart).
    pub fn new(spec: LaunchSpec, grace: Duration) -> Self {
        Self {
            spec,
            grace,
            current: Mutex::new(None),
        }
    }

    /// Stop the tracked process (if any) and start a fresh one.
    ///
    /// Returns the new pid. On spawn failure nothing is tracked afterwards;
    /// the previous instance is not brought back.
    pub async fn restart(&self) -> Result<u32, BuildError> {
        let mut current = self.current.lock().await;

        if let Some(child) = current.take() {
            let outcome = stop_child(child, self.grace).await;
            debug!(?outcome, "Previous process stopped");
        }

        let child = self.spawn()?;
        let pid = child.id().unwrap_or_default();
        *current = Some(child);

        info!(pid, program = ?self.spec.program, "Started process");

        Ok(pid)
    }

    /// Stop the tracked process without starting a replacement.
    pub async fn shutdown(&self) -> Option<StopOutcome> {
        let mut current = self.current.lock().await;
        let child = current.take()?;
        let outcome = stop_child(child, self.grace).await;
        info!(?outcome, "Supervised process stopped");
        Some(outcome)
    }

    /// Pid of the tracked process, if one is tracked.
    pub async fn pid(&self) -> Option<u32> {
        self.current.lock().await.as_ref().and_then(|c| c.id())
    }

    /// Whether a tracked process is still alive.
    pub async fn is_running(&self) -> bool {
        match self.current.lock().await.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// The configured grace period.
    pub fn grace_period(&self) -> Duration {
        self.grace
    }

    /// What this supervisor launches.
    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    fn spawn(&self) -> Result<Child, BuildError> {
        Command::new(&self.spec.program)
            .args(&self.spec.args)
            .current_dir(&self.spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: self.spec.program.clone(),
                source,
            })
    }
}

/// Interrupt, wait up to `grace`, then kill and reap.
async fn stop_child(mut child: Child, grace: Duration) -> StopOutcome {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(%status, "Process had already exited");
        return StopOutcome::AlreadyExited;
    }

    let Some(pid) = child.id() else {
        let _ = child.wait().await;
        return StopOutcome::AlreadyExited;
    };

    info!(pid, "Stopping process");

    if let Err(e) = send_interrupt(pid) {
        warn!(pid, error = %e, "Interrupt failed, killing");
        force_kill(&mut child, pid).await;
        return StopOutcome::Forced;
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            info!(pid, %status, "Process stopped gracefully");
            StopOutcome::Graceful
        }
        Ok(Err(e)) => {
            warn!(pid, error = %e, "Wait failed, killing");
            force_kill(&mut child, pid).await;
            StopOutcome::Forced
        }
        Err(_) => {
            info!(pid, grace_ms = grace.as_millis() as u64, "Graceful shutdown timed out, force killing");
            force_kill(&mut child, pid).await;
            StopOutcome::Forced
        }
    }
}

async fn force_kill(child: &mut Child, pid: u32) {
    // kill() also waits, so the child is reaped here
    if let Err(e) = child.kill().await {
        warn!(pid, error = %e, "Kill failed");
        let _ = child.wait().await;
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> Result<(), BuildError> {
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(BuildError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        })
    }
}

#[cfg(not(unix))]
fn send_interrupt(pid: u32) -> Result<(), BuildError> {
    Err(BuildError::Signal {
        pid,
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "interrupt signals are not supported on this platform",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_spec_builder() {
        let spec = LaunchSpec::new("/tmp/app", "/proj").with_args(["--port", "8080"]);
        assert_eq!(spec.program, PathBuf::from("/tmp/app"));
        assert_eq!(spec.args, vec!["--port", "8080"]);
        assert_eq!(spec.cwd, PathBuf::from("/proj"));
    }

    #[tokio::test]
    async fn test_shutdown_without_process() {
        let supervisor = ProcessSupervisor::new(LaunchSpec::new("true", "."), DEFAULT_GRACE_PERIOD);
        assert_eq!(supervisor.shutdown().await, None);
        assert!(!supervisor.is_running().await);
        assert_eq!(supervisor.pid().await, None);
    }

    #[tokio::test]
    async fn test_spawn_failure_tracks_nothing() {
        let supervisor = ProcessSupervisor::new(
            LaunchSpec::new("/definitely/not/a/program", "."),
            DEFAULT_GRACE_PERIOD,
        );
        let result = supervisor.restart().await;
        assert!(matches!(result, Err(BuildError::Spawn { .. })));
        assert_eq!(supervisor.pid().await, None);
    }
}
