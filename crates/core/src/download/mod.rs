//! Download jobs and the manager that owns them.
//!
//! `DownloadManager` keeps the registry of jobs, starts one supervised
//! downloader process per job, folds the process output into job progress and
//! publishes `DownloadEvent`s, globally and per job.

mod error;
mod manager;
mod subscription;
mod types;

pub use error::DownloadError;
pub use manager::{DownloadManager, ManagerOptions};
pub use subscription::JobSubscription;
pub use types::{DownloadEvent, DownloadEventKind, DownloadRequest, Job, JobStatus};
