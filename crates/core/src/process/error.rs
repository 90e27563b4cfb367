//! Error types for process supervision.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while starting a supervised process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Downloader binary not found.
    #[error("Downloader not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The process could not be started.
    #[error("Failed to start process: {reason}")]
    SpawnFailed { reason: String },

    /// The job already has a live process.
    #[error("Job {job_id} already has a running process")]
    AlreadySupervised { job_id: String },

    /// I/O error while starting the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    /// Creates a new spawn failure.
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }
}
