//! Job and event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::progress::ProgressSample;
use crate::source::SourceKind;

/// Lifecycle state of a job.
///
/// `pending -> downloading -> {completed | error | canceled}`, plus
/// `pending -> {error | canceled}`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Error,
    Canceled,
}

impl JobStatus {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Whether this state is absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Canceled)
    }

    /// Pending or downloading.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller asks to download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    /// Format id. When absent the default format is probed and selected.
    #[serde(default)]
    pub format: Option<String>,
    /// Target directory. When absent the configured default is used.
    #[serde(default)]
    pub destination_path: Option<PathBuf>,
    pub filename: String,
}

/// One tracked download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub format: String,
    pub destination_path: PathBuf,
    pub filename: String,
    pub source: SourceKind,
    pub status: JobStatus,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_bytes_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job with a fresh id.
    pub fn new(
        url: impl Into<String>,
        format: impl Into<String>,
        destination_path: impl Into<PathBuf>,
        filename: impl Into<String>,
        source: SourceKind,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            format: format.into(),
            destination_path: destination_path.into(),
            filename: filename.into(),
            source,
            status: JobStatus::Pending,
            progress_percent: 0.0,
            speed_bytes_per_second: None,
            eta_seconds: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Where the finished file is written.
    pub fn output_path(&self) -> PathBuf {
        self.destination_path.join(&self.filename)
    }

    /// Seconds the process ran, up to now for unfinished jobs.
    pub fn elapsed_secs(&self) -> Option<f64> {
        let started = self.started_at?;
        let until = self.finished_at.unwrap_or_else(Utc::now);
        Some((until - started).num_milliseconds().max(0) as f64 / 1000.0)
    }

    /// `pending -> downloading`. Returns false for any other state.
    pub(crate) fn mark_downloading(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Downloading;
        self.started_at.get_or_insert_with(Utc::now);
        true
    }

    /// Folds a progress sample into the job and returns the sample as it
    /// should be published. Percent never goes down.
    pub(crate) fn apply_sample(&mut self, sample: &ProgressSample) -> Option<ProgressSample> {
        if self.status.is_terminal() {
            return None;
        }
        self.mark_downloading();
        self.progress_percent = self.progress_percent.max(sample.percent);
        self.speed_bytes_per_second = sample.speed_bytes_per_second;
        self.eta_seconds = sample.eta_seconds;
        Some(ProgressSample {
            percent: self.progress_percent,
            speed_bytes_per_second: self.speed_bytes_per_second,
            eta_seconds: self.eta_seconds,
        })
    }

    pub(crate) fn mark_completed(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.progress_percent = 100.0;
        self.eta_seconds = Some(0);
        self.finished_at = Some(Utc::now());
        true
    }

    pub(crate) fn mark_failed(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
        self.finished_at = Some(Utc::now());
        true
    }

    pub(crate) fn mark_canceled(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Canceled;
        self.finished_at = Some(Utc::now());
        true
    }
}

/// Something that happened to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub job_id: String,
    #[serde(flatten)]
    pub kind: DownloadEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEventKind {
    Progress(ProgressSample),
    Completed { final_path: PathBuf },
    Error { message: String },
    Canceled,
}

impl DownloadEvent {
    pub fn new(job_id: impl Into<String>, kind: DownloadEventKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
        }
    }

    /// Whether this is the last event the job will ever produce.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, DownloadEventKind::Progress(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "https://example.com/video.mp4",
            "best",
            "/tmp",
            "video.mp4",
            SourceKind::Direct,
        )
    }

    fn sample(percent: f64) -> ProgressSample {
        ProgressSample {
            percent,
            speed_bytes_per_second: Some(1024.0),
            eta_seconds: Some(10),
        }
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress_percent, 0.0);
        assert!(job.speed_bytes_per_second.is_none());
        assert!(job.eta_seconds.is_none());
        assert!(job.started_at.is_none());
        assert_eq!(job.output_path(), PathBuf::from("/tmp/video.mp4"));
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(job().id, job().id);
    }

    #[test]
    fn test_status_terminality() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Downloading.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_sample_promotes_pending_and_never_decreases() {
        let mut job = job();
        let published = job.apply_sample(&sample(40.0)).unwrap();
        assert_eq!(job.status, JobStatus::Downloading);
        assert!(job.started_at.is_some());
        assert_eq!(published.percent, 40.0);

        let published = job.apply_sample(&sample(12.0)).unwrap();
        assert_eq!(published.percent, 40.0);
        assert_eq!(job.progress_percent, 40.0);
        assert_eq!(job.eta_seconds, Some(10));
    }

    #[test]
    fn test_completion_pins_percent() {
        let mut job = job();
        job.mark_downloading();
        job.apply_sample(&sample(87.5));
        assert!(job.mark_completed());
        assert_eq!(job.progress_percent, 100.0);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut job = job();
        assert!(job.mark_canceled());
        assert!(!job.mark_completed());
        assert!(!job.mark_failed("late failure"));
        assert!(!job.mark_canceled());
        assert!(!job.mark_downloading());
        assert!(job.apply_sample(&sample(50.0)).is_none());
        assert_eq!(job.status, JobStatus::Canceled);
        assert_eq!(job.progress_percent, 0.0);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_failure_sets_message() {
        let mut job = job();
        job.mark_downloading();
        assert!(job.mark_failed("ERROR: Video unavailable"));
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some("ERROR: Video unavailable"));
    }

    #[test]
    fn test_event_serialization() {
        let event = DownloadEvent::new("job-1", DownloadEventKind::Progress(sample(25.0)));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["job_id"], "job-1");
        assert_eq!(json["percent"], 25.0);
        assert!(!event.is_terminal());

        let event = DownloadEvent::new("job-1", DownloadEventKind::Canceled);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "canceled");
        assert!(event.is_terminal());

        let event = DownloadEvent::new(
            "job-1",
            DownloadEventKind::Error {
                message: "boom".to_string(),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: DownloadEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_job_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
    }
}
