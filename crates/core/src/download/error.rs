//! Error types for the download manager.

use thiserror::Error;

use crate::format::ProbeError;

/// Errors surfaced by `DownloadManager` operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL is not an absolute http(s) URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// A required request field is missing or malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The prober returned no formats for the URL.
    #[error("No formats available for {url}")]
    NoFormatsAvailable { url: String },

    /// The downloader process could not be started. The job is kept in the
    /// registry in the `error` state.
    #[error("Failed to start download {job_id}: {reason}")]
    SpawnFailure { job_id: String, reason: String },

    /// The downloader exited unsuccessfully. Only ever reported through a
    /// job's error message, never returned from a call.
    #[error("{message}")]
    ProcessFailure { code: Option<i32>, message: String },

    /// No job with this id.
    #[error("Unknown download: {job_id}")]
    UnknownJob { job_id: String },

    /// Format probing failed.
    #[error("Format probe failed: {0}")]
    Probe(#[from] ProbeError),
}

impl DownloadError {
    /// Creates a new invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates a new spawn failure error.
    pub fn spawn_failure(job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailure {
            job_id: job_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unknown job error.
    pub fn unknown_job(job_id: impl Into<String>) -> Self {
        Self::UnknownJob {
            job_id: job_id.into(),
        }
    }
}
