//! One live process per job, with stale-handle protection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::SupervisorError;
use super::traits::{LaunchedProcess, ProcessBackend, ProcessObserver, Terminator};
use super::types::{LaunchSpec, ProcessExit};

/// Identifies one spawned process.
///
/// Handles carry a serial that is never reused, so a handle kept around after
/// its process exited can never terminate a later process of the same job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    job_id: String,
    serial: u64,
    pid: Option<u32>,
}

impl ProcessHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

struct LiveProcess {
    serial: u64,
    terminator: Box<dyn Terminator>,
}

type LiveTable = Arc<Mutex<HashMap<String, LiveProcess>>>;

/// Starts processes through a `ProcessBackend` and relays what they do.
pub struct ProcessSupervisor {
    backend: Arc<dyn ProcessBackend>,
    live: LiveTable,
    next_serial: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new(backend: Arc<dyn ProcessBackend>) -> Self {
        Self {
            backend,
            live: Arc::new(Mutex::new(HashMap::new())),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Checks that the backend can start processes.
    pub async fn validate(&self) -> Result<(), SupervisorError> {
        self.backend.validate().await
    }

    /// Starts a process for `job_id`.
    ///
    /// Every output line is passed to `observer.on_output_line` in order, then
    /// the handle is released and `observer.on_exit` runs exactly once. Fails
    /// without side effects if the job already has a live process or the
    /// backend cannot start one.
    pub async fn spawn(
        &self,
        job_id: &str,
        spec: LaunchSpec,
        observer: Arc<dyn ProcessObserver>,
    ) -> Result<ProcessHandle, SupervisorError> {
        if self.live.lock().await.contains_key(job_id) {
            return Err(SupervisorError::AlreadySupervised {
                job_id: job_id.to_string(),
            });
        }

        let LaunchedProcess {
            pid,
            output,
            exit,
            terminator,
        } = self.backend.launch(&spec).await?;

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        {
            let mut live = self.live.lock().await;
            if live.contains_key(job_id) {
                // Lost a race with another spawn for the same job
                terminator.terminate();
                return Err(SupervisorError::AlreadySupervised {
                    job_id: job_id.to_string(),
                });
            }
            live.insert(job_id.to_string(), LiveProcess { serial, terminator });
        }

        info!(job_id = %job_id, pid = ?pid, backend = %self.backend.name(), "Process started");

        let handle = ProcessHandle {
            job_id: job_id.to_string(),
            serial,
            pid,
        };

        tokio::spawn(relay(
            job_id.to_string(),
            serial,
            output,
            exit,
            observer,
            Arc::clone(&self.live),
        ));

        Ok(handle)
    }

    /// Asks the process behind `handle` to stop.
    ///
    /// Returns whether a signal was sent. A handle whose process already exited
    /// is ignored.
    pub async fn kill(&self, handle: &ProcessHandle) -> bool {
        let live = self.live.lock().await;
        match live.get(&handle.job_id) {
            Some(process) if process.serial == handle.serial => {
                debug!(job_id = %handle.job_id, pid = ?handle.pid, "Terminating process");
                process.terminator.terminate();
                true
            }
            _ => {
                debug!(job_id = %handle.job_id, "Ignoring kill for stale handle");
                false
            }
        }
    }

    /// Signals every live process. Returns how many were signaled.
    pub async fn kill_all(&self) -> usize {
        let live = self.live.lock().await;
        for (job_id, process) in live.iter() {
            debug!(job_id = %job_id, "Terminating process");
            process.terminator.terminate();
        }
        live.len()
    }

    /// Number of processes that have not exited yet.
    pub async fn live_count(&self) -> usize {
        self.live.lock().await.len()
    }
}

async fn relay(
    job_id: String,
    serial: u64,
    mut output: tokio::sync::mpsc::Receiver<String>,
    exit: tokio::sync::oneshot::Receiver<ProcessExit>,
    observer: Arc<dyn ProcessObserver>,
    live: LiveTable,
) {
    while let Some(line) = output.recv().await {
        observer.on_output_line(&job_id, line).await;
    }

    let exit = exit.await.unwrap_or_else(|_| {
        warn!(job_id = %job_id, "Process exit status was lost");
        ProcessExit::failure(None, "process exit status was lost")
    });

    {
        let mut live = live.lock().await;
        if live.get(&job_id).is_some_and(|p| p.serial == serial) {
            live.remove(&job_id);
        }
    }

    debug!(job_id = %job_id, exit = ?exit, "Process finished");
    observer.on_exit(&job_id, exit).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProcessBackend, MockScript};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tokio::sync::RwLock;
    use tokio::time::{timeout, Duration};

    #[derive(Default)]
    struct RecordingObserver {
        events: RwLock<Vec<String>>,
        exited: tokio::sync::Notify,
    }

    #[async_trait]
    impl ProcessObserver for RecordingObserver {
        async fn on_output_line(&self, job_id: &str, line: String) {
            self.events.write().await.push(format!("{}:line:{}", job_id, line));
        }

        async fn on_exit(&self, job_id: &str, exit: ProcessExit) {
            self.events
                .write()
                .await
                .push(format!("{}:exit:{:?}", job_id, exit));
            self.exited.notify_one();
        }
    }

    fn spec() -> LaunchSpec {
        LaunchSpec {
            url: "https://example.com/video.mp4".to_string(),
            format: "best".to_string(),
            destination_path: PathBuf::from("/tmp"),
            filename: "video.mp4".to_string(),
        }
    }

    async fn wait_for_exit(observer: &RecordingObserver) {
        timeout(Duration::from_secs(5), observer.exited.notified())
            .await
            .expect("process did not exit");
    }

    #[tokio::test]
    async fn test_lines_are_delivered_before_exit() {
        let backend = Arc::new(MockProcessBackend::new());
        backend
            .push_script(MockScript::lines(["a", "b", "c"], ProcessExit::Success))
            .await;
        let supervisor = ProcessSupervisor::new(backend.clone());
        let observer = Arc::new(RecordingObserver::default());

        supervisor.spawn("job-1", spec(), observer.clone()).await.unwrap();
        wait_for_exit(&observer).await;

        let events = observer.events.read().await;
        assert_eq!(
            *events,
            vec![
                "job-1:line:a".to_string(),
                "job-1:line:b".to_string(),
                "job-1:line:c".to_string(),
                "job-1:exit:Success".to_string(),
            ]
        );
        assert_eq!(supervisor.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_kill_terminates_live_process() {
        let backend = Arc::new(MockProcessBackend::new());
        backend.push_script(MockScript::Manual).await;
        let supervisor = ProcessSupervisor::new(backend.clone());
        let observer = Arc::new(RecordingObserver::default());

        let handle = supervisor.spawn("job-1", spec(), observer.clone()).await.unwrap();
        assert_eq!(supervisor.live_count().await, 1);

        assert!(supervisor.kill(&handle).await);
        wait_for_exit(&observer).await;

        let controller = backend.controller(0).await.unwrap();
        assert!(controller.was_terminated());
        assert_eq!(
            observer.events.read().await.last().unwrap(),
            "job-1:exit:Terminated"
        );
    }

    #[tokio::test]
    async fn test_kill_with_stale_handle_is_noop() {
        let backend = Arc::new(MockProcessBackend::new());
        backend
            .push_script(MockScript::lines(Vec::<String>::new(), ProcessExit::Success))
            .await;
        backend.push_script(MockScript::Manual).await;
        let supervisor = ProcessSupervisor::new(backend.clone());

        let first_observer = Arc::new(RecordingObserver::default());
        let stale = supervisor
            .spawn("job-1", spec(), first_observer.clone())
            .await
            .unwrap();
        wait_for_exit(&first_observer).await;

        // Same job id, new process
        let second_observer = Arc::new(RecordingObserver::default());
        let fresh = supervisor
            .spawn("job-1", spec(), second_observer.clone())
            .await
            .unwrap();
        assert_ne!(stale, fresh);

        assert!(!supervisor.kill(&stale).await);
        let controller = backend.controller(1).await.unwrap();
        assert!(!controller.was_terminated());

        assert!(supervisor.kill(&fresh).await);
        wait_for_exit(&second_observer).await;
        assert!(controller.was_terminated());
    }

    #[tokio::test]
    async fn test_spawn_twice_for_same_job_fails() {
        let backend = Arc::new(MockProcessBackend::new());
        backend.push_script(MockScript::Manual).await;
        let supervisor = ProcessSupervisor::new(backend.clone());
        let observer = Arc::new(RecordingObserver::default());

        supervisor.spawn("job-1", spec(), observer.clone()).await.unwrap();
        let result = supervisor.spawn("job-1", spec(), observer.clone()).await;
        assert!(matches!(
            result,
            Err(SupervisorError::AlreadySupervised { .. })
        ));
        assert_eq!(backend.launch_count().await, 1);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_no_handle() {
        let backend = Arc::new(MockProcessBackend::new());
        backend
            .set_next_error(SupervisorError::BinaryNotFound {
                path: PathBuf::from("/missing/yt-dlp"),
            })
            .await;
        let supervisor = ProcessSupervisor::new(backend.clone());
        let observer = Arc::new(RecordingObserver::default());

        let result = supervisor.spawn("job-1", spec(), observer.clone()).await;
        assert!(matches!(result, Err(SupervisorError::BinaryNotFound { .. })));
        assert_eq!(supervisor.live_count().await, 0);
        assert!(observer.events.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_kill_all() {
        let backend = Arc::new(MockProcessBackend::new());
        backend.push_script(MockScript::Manual).await;
        backend.push_script(MockScript::Manual).await;
        let supervisor = ProcessSupervisor::new(backend.clone());
        let observer = Arc::new(RecordingObserver::default());

        supervisor.spawn("job-1", spec(), observer.clone()).await.unwrap();
        supervisor.spawn("job-2", spec(), observer.clone()).await.unwrap();

        assert_eq!(supervisor.kill_all().await, 2);
        assert!(backend.controller(0).await.unwrap().was_terminated());
        assert!(backend.controller(1).await.unwrap().was_terminated());
    }
}
