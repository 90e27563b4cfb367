//! tokio process backend for yt-dlp compatible downloaders.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::DownloaderConfig;

use super::error::SupervisorError;
use super::traits::{LaunchedProcess, ProcessBackend, Terminator};
use super::types::{LaunchSpec, ProcessExit};

const OUTPUT_BUFFER: usize = 128;
const STDERR_TAIL_LINES: usize = 20;
/// How long to wait for output pipes to close after the process exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the configured downloader binary as a child process.
pub struct CommandBackend {
    config: DownloaderConfig,
}

impl CommandBackend {
    /// Creates a new backend with the given downloader configuration.
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Creates a backend with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DownloaderConfig::default())
    }

    /// Builds the downloader arguments for a launch.
    fn build_args(&self, spec: &LaunchSpec) -> Vec<String> {
        let mut args = vec![
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            spec.format.clone(),
            "-o".to_string(),
            spec.output_path().to_string_lossy().into_owned(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        // Guard against URLs that look like options
        args.push("--".to_string());
        args.push(spec.url.clone());
        args
    }

    fn map_spawn_error(&self, e: std::io::Error) -> SupervisorError {
        if e.kind() == std::io::ErrorKind::NotFound {
            SupervisorError::BinaryNotFound {
                path: self.config.binary_path.clone(),
            }
        } else {
            SupervisorError::Io(e)
        }
    }
}

/// Kill switch for a child process. The first call wins, later calls do nothing.
struct CommandTerminator {
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Terminator for CommandTerminator {
    fn terminate(&self) {
        let sender = match self.kill_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(tx) = sender {
            // Receiver is gone once the child has been reaped
            let _ = tx.send(());
        }
    }
}

/// Picks the most useful failure message from the stderr tail.
fn failure_message(stderr_tail: &VecDeque<String>, code: Option<i32>) -> String {
    stderr_tail
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR"))
        .or_else(|| stderr_tail.back())
        .cloned()
        .unwrap_or_else(|| match code {
            Some(code) => format!("downloader exited with code {}", code),
            None => "downloader was killed by a signal".to_string(),
        })
}

#[async_trait]
impl ProcessBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess, SupervisorError> {
        let args = self.build_args(spec);
        debug!(
            binary = %self.config.binary_path.display(),
            args = ?args,
            "Launching downloader"
        );

        let mut child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        let pid = child.id();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SupervisorError::spawn_failed("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SupervisorError::spawn_failed("stderr was not captured"))?;

        let (line_tx, line_rx) = mpsc::channel(OUTPUT_BUFFER);
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut stdout_task = tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
            });

            let mut stderr_task = tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            });

            let mut terminated = false;
            let status = tokio::select! {
                status = child.wait() => status,
                // A dropped terminator means nobody can stop the process any more
                _ = &mut kill_rx => {
                    terminated = true;
                    if let Err(e) = child.start_kill() {
                        warn!(pid = ?pid, error = %e, "Failed to signal downloader");
                    }
                    child.wait().await
                }
            };

            // Children of the downloader may keep the pipes open after it exits
            if timeout(DRAIN_TIMEOUT, &mut stdout_task).await.is_err() {
                stdout_task.abort();
            }
            let stderr_tail = match timeout(DRAIN_TIMEOUT, &mut stderr_task).await {
                Ok(Ok(tail)) => tail,
                Ok(Err(_)) => VecDeque::new(),
                Err(_) => {
                    stderr_task.abort();
                    VecDeque::new()
                }
            };

            let exit = match status {
                _ if terminated => ProcessExit::Terminated,
                Ok(status) if status.success() => ProcessExit::Success,
                Ok(status) => ProcessExit::failure(
                    status.code(),
                    failure_message(&stderr_tail, status.code()),
                ),
                Err(e) => {
                    ProcessExit::failure(None, format!("failed to wait for downloader: {}", e))
                }
            };

            debug!(pid = ?pid, exit = ?exit, "Downloader exited");
            let _ = exit_tx.send(exit);
        });

        Ok(LaunchedProcess {
            pid,
            output: line_rx,
            exit: exit_rx,
            terminator: Box::new(CommandTerminator {
                kill_tx: Mutex::new(Some(kill_tx)),
            }),
        })
    }

    async fn validate(&self) -> Result<(), SupervisorError> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            return Err(SupervisorError::spawn_failed(format!(
                "{} --version exited with code {:?}",
                self.config.binary_path.display(),
                output.status.code()
            )));
        }

        Ok(())
    }
}
