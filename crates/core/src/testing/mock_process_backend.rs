//! Mock process backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::process::{
    LaunchSpec, LaunchedProcess, ProcessBackend, ProcessExit, SupervisorError, Terminator,
};

const OUTPUT_BUFFER: usize = 1024;

/// What a mock process does once launched.
#[derive(Debug, Clone)]
pub enum MockScript {
    /// Emits `lines` (pausing `line_delay` before each), then exits with `exit`.
    /// Termination stops the script early with `ProcessExit::Terminated`.
    Scripted {
        lines: Vec<String>,
        line_delay: Duration,
        exit: ProcessExit,
    },
    /// Does nothing until driven through its `MockProcessController`.
    Manual,
}

impl MockScript {
    /// Emits `lines` back to back, then exits with `exit`.
    pub fn lines<I>(lines: I, exit: ProcessExit) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::Scripted {
            lines: lines.into_iter().map(Into::into).collect(),
            line_delay: Duration::ZERO,
            exit,
        }
    }

    /// Sets the pause before each scripted line.
    pub fn with_line_delay(self, delay: Duration) -> Self {
        match self {
            Self::Scripted { lines, exit, .. } => Self::Scripted {
                lines,
                line_delay: delay,
                exit,
            },
            Self::Manual => Self::Manual,
        }
    }
}

impl Default for MockScript {
    fn default() -> Self {
        Self::lines(Vec::<String>::new(), ProcessExit::Success)
    }
}

/// Drives one mock process.
#[derive(Debug)]
pub struct MockProcessController {
    spec: LaunchSpec,
    line_tx: Mutex<Option<mpsc::Sender<String>>>,
    exit_tx: Mutex<Option<oneshot::Sender<ProcessExit>>>,
    terminated: AtomicBool,
}

impl MockProcessController {
    /// The launch this process was started for.
    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Writes one output line. Returns false once the process has exited.
    pub async fn emit_line(&self, line: impl Into<String>) -> bool {
        let sender = self
            .line_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match sender {
            Some(tx) => tx.send(line.into()).await.is_ok(),
            None => false,
        }
    }

    /// Ends the process. Returns false if it had already exited.
    pub fn finish(&self, exit: ProcessExit) -> bool {
        // Close output first so every emitted line is seen before the exit
        self.line_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let exit_tx = self
            .exit_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match exit_tx {
            Some(tx) => {
                let _ = tx.send(exit);
                true
            }
            None => false,
        }
    }

    /// Whether the process has exited.
    pub fn is_finished(&self) -> bool {
        self.exit_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// Whether the process was stopped through its terminator.
    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

struct MockTerminator {
    controller: Arc<MockProcessController>,
}

impl Terminator for MockTerminator {
    fn terminate(&self) {
        if self.controller.is_finished() {
            return;
        }
        self.controller.terminated.store(true, Ordering::SeqCst);
        self.controller.finish(ProcessExit::Terminated);
    }
}

impl Drop for MockTerminator {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Mock implementation of the ProcessBackend trait.
///
/// Each launch takes the next queued `MockScript` (or the default one) and is
/// recorded with a `MockProcessController` that tests can use to push output,
/// end the process, or check whether it was terminated.
///
/// # Example
///
/// ```rust,ignore
/// use mediamine_core::testing::{MockProcessBackend, MockScript};
///
/// let backend = MockProcessBackend::new();
/// backend.push_script(MockScript::Manual).await;
///
/// // ...start a download...
///
/// let process = backend.last_controller().await.unwrap();
/// process.emit_line("[download]  50.0% of 10.00MiB").await;
/// process.finish(ProcessExit::Success);
/// ```
#[derive(Debug, Default)]
pub struct MockProcessBackend {
    /// Every successfully launched process, in launch order.
    controllers: Arc<RwLock<Vec<Arc<MockProcessController>>>>,
    /// Scripts consumed by upcoming launches.
    scripts: Arc<RwLock<VecDeque<MockScript>>>,
    /// Script used when the queue is empty.
    default_script: Arc<RwLock<MockScript>>,
    /// If set, the next launch will fail with this error.
    next_error: Arc<RwLock<Option<SupervisorError>>>,
    /// Whether `validate` reports a missing binary.
    unavailable: Arc<RwLock<bool>>,
    /// Pause inside `launch` before the process exists.
    launch_delay: Arc<RwLock<Duration>>,
}

impl MockProcessBackend {
    /// Create a new mock backend whose processes exit successfully at once.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next launch.
    pub async fn push_script(&self, script: MockScript) {
        self.scripts.write().await.push_back(script);
    }

    /// Set the script used when no queued script is left.
    pub async fn set_default_script(&self, script: MockScript) {
        *self.default_script.write().await = script;
    }

    /// Configure the next launch to fail with the given error.
    pub async fn set_next_error(&self, error: SupervisorError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make `validate` fail as if the binary were missing.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Makes every later launch wait `delay` before the process starts.
    pub async fn set_launch_delay(&self, delay: Duration) {
        *self.launch_delay.write().await = delay;
    }

    /// Controller of the `index`th launched process.
    pub async fn controller(&self, index: usize) -> Option<Arc<MockProcessController>> {
        self.controllers.read().await.get(index).cloned()
    }

    /// Controller of the most recently launched process.
    pub async fn last_controller(&self) -> Option<Arc<MockProcessController>> {
        self.controllers.read().await.last().cloned()
    }

    /// Specs of all launched processes.
    pub async fn launches(&self) -> Vec<LaunchSpec> {
        self.controllers
            .read()
            .await
            .iter()
            .map(|c| c.spec.clone())
            .collect()
    }

    /// Number of processes launched.
    pub async fn launch_count(&self) -> usize {
        self.controllers.read().await.len()
    }

    async fn next_script(&self) -> MockScript {
        match self.scripts.write().await.pop_front() {
            Some(script) => script,
            None => self.default_script.read().await.clone(),
        }
    }
}

#[async_trait]
impl ProcessBackend for MockProcessBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError> {
        let delay = *self.launch_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let (line_tx, line_rx) = mpsc::channel(OUTPUT_BUFFER);
        let (exit_tx, exit_rx) = oneshot::channel();
        let controller = Arc::new(MockProcessController {
            spec: spec.clone(),
            line_tx: Mutex::new(Some(line_tx)),
            exit_tx: Mutex::new(Some(exit_tx)),
            terminated: AtomicBool::new(false),
        });
        self.controllers.write().await.push(Arc::clone(&controller));

        if let MockScript::Scripted {
            lines,
            line_delay,
            exit,
        } = self.next_script().await
        {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                for line in lines {
                    if !line_delay.is_zero() {
                        tokio::time::sleep(line_delay).await;
                    }
                    if !controller.emit_line(line).await {
                        return;
                    }
                }
                controller.finish(exit);
            });
        }

        Ok(LaunchedProcess {
            pid: None,
            output: line_rx,
            exit: exit_rx,
            terminator: Box::new(MockTerminator { controller }),
        })
    }

    async fn validate(&self) -> Result<(), SupervisorError> {
        if *self.unavailable.read().await {
            return Err(SupervisorError::BinaryNotFound {
                path: PathBuf::from("mock-yt-dlp"),
            });
        }
        Ok(())
    }
}
