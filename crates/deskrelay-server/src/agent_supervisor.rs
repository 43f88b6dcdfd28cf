//! Supervises the agent dispatcher child process (§4.3 "Agent supervision"),
//! adapted from the teacher's GDB server spawn-then-verify pattern and the
//! graceful-then-force-kill timing from the pack's runtime supervisor.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AgentSupervisorError {
    #[error("agent is already running")]
    AlreadyRunning,
    #[error("agent is not running")]
    NotRunning,
    #[error("failed to spawn agent: {0}")]
    SpawnFailed(String),
    #[error("agent exited immediately after start (status: {0})")]
    CrashedOnStart(String),
}

pub struct AgentHandle {
    child: Child,
    started_at: Instant,
}

#[derive(Default)]
pub struct AgentSupervisor {
    binary_path: String,
    handle: tokio::sync::Mutex<Option<AgentHandle>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub uptime_seconds: u64,
}

impl AgentSupervisor {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn start(&self) -> Result<(), AgentSupervisorError> {
        let mut guard = self.handle.lock().await;
        if guard.is_some() {
            return Err(AgentSupervisorError::AlreadyRunning);
        }

        let mut child = Command::new(&self.binary_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| AgentSupervisorError::SpawnFailed(e.to_string()))?;

        tokio::time::sleep(Duration::from_secs(1)).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(AgentSupervisorError::CrashedOnStart(status.to_string()));
            }
            Ok(None) => {}
            Err(e) => return Err(AgentSupervisorError::SpawnFailed(e.to_string())),
        }

        info!(pid = child.id(), "agent dispatcher started");
        *guard = Some(AgentHandle {
            child,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Graceful terminate, wait up to 5 seconds, then force-kill (§4.3).
    pub async fn stop(&self) -> Result<(), AgentSupervisorError> {
        let mut guard = self.handle.lock().await;
        let handle = guard.take().ok_or(AgentSupervisorError::NotRunning)?;
        let mut child = handle.child;

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            send_signal(pid, "-TERM");
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Ok(None) => {
                    warn!("agent did not exit gracefully within 5s, force-killing");
                    let _ = child.kill().await;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "error waiting on agent process");
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn status(&self) -> AgentStatus {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.as_mut() {
            if let Ok(Some(_)) = handle.child.try_wait() {
                let exited = guard.take();
                drop(exited);
                return AgentStatus {
                    running: false,
                    pid: None,
                    uptime_seconds: 0,
                };
            }
        }
        match guard.as_ref() {
            Some(handle) => AgentStatus {
                running: true,
                pid: handle.child.id(),
                uptime_seconds: handle.started_at.elapsed().as_secs(),
            },
            None => AgentStatus {
                running: false,
                pid: None,
                uptime_seconds: 0,
            },
        }
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: &str) {
    let _ = std::process::Command::new("kill")
        .arg(signal)
        .arg(pid.to_string())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_not_running_before_start() {
        let supervisor = AgentSupervisor::new("/bin/true");
        let status = supervisor.status().await;
        assert!(!status.running);
    }

    #[tokio::test]
    async fn crash_on_start_is_detected() {
        let supervisor = AgentSupervisor::new("false");
        let result = supervisor.start().await;
        assert!(matches!(
            result,
            Err(AgentSupervisorError::CrashedOnStart(_))
        ));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let supervisor = AgentSupervisor::new("sleep");
        // `sleep` with no args exits with a usage error almost immediately on
        // most systems, so exercise the "already running" guard directly
        // instead of depending on that timing.
        {
            let mut guard = supervisor.handle.lock().await;
            let child = tokio::process::Command::new("sleep")
                .arg("5")
                .spawn()
                .unwrap();
            *guard = Some(AgentHandle {
                child,
                started_at: Instant::now(),
            });
        }
        assert!(matches!(
            supervisor.start().await,
            Err(AgentSupervisorError::AlreadyRunning)
        ));
        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_without_start_is_not_running_error() {
        let supervisor = AgentSupervisor::new("/bin/true");
        assert!(matches!(
            supervisor.stop().await,
            Err(AgentSupervisorError::NotRunning)
        ));
    }
}
