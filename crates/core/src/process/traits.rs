//! Trait definitions for process supervision.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::error::SupervisorError;
use super::types::{LaunchSpec, ProcessExit};

/// Stops a running process. Must be a no-op once the process has exited.
///
/// Dropping a terminator while its process is still running terminates the
/// process.
pub trait Terminator: Send + Sync {
    /// Sends a best-effort termination signal. Never blocks, never fails.
    fn terminate(&self);
}

/// A process started by a `ProcessBackend`.
///
/// `output` yields every line the process writes to its progress stream and
/// closes before `exit` resolves.
pub struct LaunchedProcess {
    /// OS process id, if the backend has one.
    pub pid: Option<u32>,
    /// Line-delimited output of the process.
    pub output: mpsc::Receiver<String>,
    /// Resolves once with how the process ended.
    pub exit: oneshot::Receiver<ProcessExit>,
    /// Kill switch for the process.
    pub terminator: Box<dyn Terminator>,
}

impl std::fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Something that can start download processes.
#[async_trait]
pub trait ProcessBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Starts a process for `spec`. Returns once the process is running.
    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError>;

    /// Validates that the backend is properly configured and ready.
    async fn validate(&self) -> Result<(), SupervisorError>;
}

/// Receives what a supervised process does, keyed by job id.
///
/// For one job, every `on_output_line` call happens before `on_exit`, and
/// `on_exit` is called exactly once.
#[async_trait]
pub trait ProcessObserver: Send + Sync {
    /// Called for each output line, in order.
    async fn on_output_line(&self, job_id: &str, line: String);

    /// Called once after the process ended and its output was drained.
    async fn on_exit(&self, job_id: &str, exit: ProcessExit);
}
