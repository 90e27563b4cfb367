//! Types for process supervision.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything needed to start one download process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Source URL handed to the downloader.
    pub url: String,
    /// Format identifier to download.
    pub format: String,
    /// Directory the file is written to.
    pub destination_path: PathBuf,
    /// File name inside `destination_path`.
    pub filename: String,
}

impl LaunchSpec {
    /// Where the downloaded file ends up.
    pub fn output_path(&self) -> PathBuf {
        self.destination_path.join(&self.filename)
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessExit {
    /// Exited with status zero.
    Success,
    /// Exited non-zero, was killed by something else, or its status was lost.
    Failure {
        code: Option<i32>,
        message: String,
    },
    /// Stopped because the supervisor asked it to.
    Terminated,
}

impl ProcessExit {
    /// Creates a failure exit.
    pub fn failure(code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Whether the process finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
