//! Error types for format probing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while asking the external prober for formats.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Prober binary not found.
    #[error("Downloader not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The prober ran but reported a failure.
    #[error("Format probe failed: {reason}")]
    Failed { reason: String },

    /// The URL yielded no formats at all.
    #[error("No formats available")]
    NoFormats,

    /// The prober output could not be understood.
    #[error("Failed to parse format list: {reason}")]
    ParseError { reason: String },

    /// The prober did not answer in time.
    #[error("Format probe timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the prober.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Creates a new probe failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Creates a new parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same probe may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
