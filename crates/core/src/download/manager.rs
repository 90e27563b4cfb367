//! The download registry and its public API.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::format::{select_default_format, FormatDescriptor, FormatProber, ProbeError};
use crate::metrics;
use crate::process::{
    LaunchSpec, ProcessBackend, ProcessExit, ProcessHandle, ProcessObserver, ProcessSupervisor,
    SupervisorError,
};
use crate::progress::parse_progress_line;
use crate::source::{self, SourceKind};

use super::error::DownloadError;
use super::subscription::JobSubscription;
use super::types::{DownloadEvent, DownloadEventKind, DownloadRequest, Job, JobStatus};

/// Settings for a `DownloadManager`.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Directory used when a request names none.
    pub default_destination: PathBuf,
    /// Capacity of the global and per-job event channels.
    pub channel_capacity: usize,
}

impl ManagerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_destination: config.downloader.default_destination.clone(),
            channel_capacity: config.events.channel_capacity,
        }
    }
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Registry state for one job. All mutation of the job goes through its mutex.
struct JobEntry {
    job: Job,
    process: Option<ProcessHandle>,
    /// Dropped after the terminal event so subscriptions close.
    events: Option<broadcast::Sender<DownloadEvent>>,
}

#[derive(Default)]
struct Registry {
    order: Vec<String>,
    jobs: HashMap<String, Arc<Mutex<JobEntry>>>,
}

struct ManagerInner {
    registry: RwLock<Registry>,
    supervisor: ProcessSupervisor,
    prober: Arc<dyn FormatProber>,
    events: broadcast::Sender<DownloadEvent>,
    options: ManagerOptions,
}

/// Owns every download job and the process behind it.
///
/// Cheap to clone; clones share the same registry. Mutations of one job are
/// serialized, different jobs proceed independently. When a cancel and a
/// process exit race, whichever reaches the job first decides the terminal
/// state and the other is dropped.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<ManagerInner>,
}

impl DownloadManager {
    pub fn new(
        backend: Arc<dyn ProcessBackend>,
        prober: Arc<dyn FormatProber>,
        options: ManagerOptions,
    ) -> Self {
        let capacity = options.channel_capacity.max(1);
        let (events, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(ManagerInner {
                registry: RwLock::new(Registry::default()),
                supervisor: ProcessSupervisor::new(backend),
                prober,
                events,
                options,
            }),
        }
    }

    /// Returns true iff `url` is an absolute http(s) URL.
    pub fn validate_url(&self, url: &str) -> bool {
        source::validate_url(url)
    }

    pub fn classify_url(&self, url: &str) -> SourceKind {
        source::classify_url(url)
    }

    /// Checks that downloader processes can be started.
    pub async fn validate_backend(&self) -> Result<(), SupervisorError> {
        self.inner.supervisor.validate().await
    }

    /// Checks that the format prober can run.
    pub async fn validate_prober(&self) -> Result<(), ProbeError> {
        self.inner.prober.validate().await
    }

    /// Lists the formats available for `url`.
    ///
    /// Dropping the returned future abandons the probe.
    pub async fn fetch_formats(&self, url: &str) -> Result<Vec<FormatDescriptor>, DownloadError> {
        let url = url.trim();
        if !source::validate_url(url) {
            return Err(DownloadError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let started = Instant::now();
        let result = self.inner.prober.probe(url).await;
        let outcome = match &result {
            Ok(formats) if !formats.is_empty() => "success",
            Ok(_) | Err(ProbeError::NoFormats) => "no_formats",
            Err(ProbeError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        let elapsed = started.elapsed();
        metrics::PROBE_REQUESTS.with_label_values(&[outcome]).inc();
        metrics::PROBE_DURATION
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
        debug!(
            url = %url,
            prober = %self.inner.prober.name(),
            result = outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Format probe finished"
        );

        match result {
            Ok(formats) if !formats.is_empty() => Ok(formats),
            Ok(_) | Err(ProbeError::NoFormats) => Err(DownloadError::NoFormatsAvailable {
                url: url.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a job and launches its downloader.
    ///
    /// Returns the job as soon as the process is running, in the `downloading`
    /// state. A request without a format probes the URL and picks the default
    /// format first. If the process cannot be started the job stays registered
    /// in the `error` state and `SpawnFailure` is returned. Dropping the future
    /// before the process is running fails the job instead of leaving it
    /// `pending`.
    pub async fn start(&self, request: DownloadRequest) -> Result<Job, DownloadError> {
        let DownloadRequest {
            url,
            format,
            destination_path,
            filename,
        } = request;

        let url = url.trim().to_string();
        if url.is_empty() {
            return Err(DownloadError::invalid_request("url must not be empty"));
        }
        if !source::validate_url(&url) {
            return Err(DownloadError::InvalidUrl { url });
        }
        validate_filename(&filename)?;

        let destination_path = match destination_path {
            Some(path) if path.as_os_str().is_empty() => {
                return Err(DownloadError::invalid_request(
                    "destination_path must not be empty",
                ))
            }
            Some(path) => path,
            None => self.inner.options.default_destination.clone(),
        };

        let format = match format {
            Some(format) if format.trim().is_empty() => {
                return Err(DownloadError::invalid_request("format must not be empty"))
            }
            Some(format) => format,
            None => {
                let formats = self.fetch_formats(&url).await?;
                let chosen = select_default_format(&formats).map_err(|_| {
                    DownloadError::NoFormatsAvailable { url: url.clone() }
                })?;
                debug!(url = %url, format = %chosen.format_id, "Selected default format");
                chosen.format_id.clone()
            }
        };

        let source = source::classify_url(&url);
        let job = Job::new(url, format, destination_path, filename, source);
        let job_id = job.id.clone();
        let spec = LaunchSpec {
            url: job.url.clone(),
            format: job.format.clone(),
            destination_path: job.destination_path.clone(),
            filename: job.filename.clone(),
        };

        let (job_events, _) = broadcast::channel(self.inner.options.channel_capacity.max(1));
        let slot = Arc::new(Mutex::new(JobEntry {
            job,
            process: None,
            events: Some(job_events),
        }));

        // Held until the process is registered, so callbacks and cancels wait
        let mut entry = slot.lock().await;
        {
            let mut registry = self.inner.registry.write().await;
            registry.order.push(job_id.clone());
            registry.jobs.insert(job_id.clone(), Arc::clone(&slot));
        }
        let pending = PendingStart::new(Arc::clone(&self.inner), job_id.clone());
        info!(
            job_id = %job_id,
            url = %entry.job.url,
            format = %entry.job.format,
            source = %source,
            "Download created"
        );

        let observer: Arc<dyn ProcessObserver> = self.inner.clone();
        let spawned = self.inner.supervisor.spawn(&job_id, spec, observer).await;
        pending.disarm();
        match spawned {
            Ok(handle) => {
                entry.process = Some(handle);
                entry.job.mark_downloading();
                metrics::DOWNLOADS_STARTED.inc();
                info!(job_id = %job_id, "Download started");
                Ok(entry.job.clone())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(job_id = %job_id, error = %reason, "Failed to start downloader");
                metrics::SPAWN_FAILURES.inc();
                entry.job.mark_failed(reason.clone());
                self.inner.record_terminal(&entry.job);
                self.inner.publish(
                    &mut entry,
                    DownloadEventKind::Error {
                        message: reason.clone(),
                    },
                );
                Err(DownloadError::spawn_failure(job_id, reason))
            }
        }
    }

    /// Cancels a pending or downloading job.
    ///
    /// Returns whether this call canceled it. Unknown ids and finished jobs are
    /// left alone.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let Some(slot) = self.inner.entry(job_id).await else {
            debug!(job_id = %job_id, "Cancel for unknown download ignored");
            return false;
        };

        let mut entry = slot.lock().await;
        if !entry.job.mark_canceled() {
            debug!(
                job_id = %job_id,
                status = %entry.job.status,
                "Cancel for finished download ignored"
            );
            return false;
        }

        if let Some(handle) = entry.process.take() {
            self.inner.supervisor.kill(&handle).await;
        }

        info!(job_id = %job_id, "Download canceled");
        self.inner.record_terminal(&entry.job);
        self.inner.publish(&mut entry, DownloadEventKind::Canceled);
        true
    }

    /// Snapshot of one job.
    pub async fn get_download(&self, job_id: &str) -> Option<Job> {
        let slot = self.inner.entry(job_id).await?;
        let entry = slot.lock().await;
        Some(entry.job.clone())
    }

    /// Pending and downloading jobs, oldest first.
    pub async fn get_active_downloads(&self) -> Vec<Job> {
        self.get_all_downloads()
            .await
            .into_iter()
            .filter(|job| job.status.is_active())
            .collect()
    }

    /// Every job ever started, oldest first.
    pub async fn get_all_downloads(&self) -> Vec<Job> {
        let slots: Vec<_> = {
            let registry = self.inner.registry.read().await;
            registry
                .order
                .iter()
                .filter_map(|id| registry.jobs.get(id).cloned())
                .collect()
        };

        let mut jobs = Vec::with_capacity(slots.len());
        for slot in slots {
            jobs.push(slot.lock().await.job.clone());
        }
        jobs
    }

    pub async fn active_count(&self) -> usize {
        self.get_active_downloads().await.len()
    }

    /// Events of one job until its terminal event.
    pub async fn subscribe(&self, job_id: &str) -> Result<JobSubscription, DownloadError> {
        let slot = self
            .inner
            .entry(job_id)
            .await
            .ok_or_else(|| DownloadError::unknown_job(job_id))?;
        let entry = slot.lock().await;
        let receiver = entry.events.as_ref().map(|tx| tx.subscribe());
        Ok(JobSubscription::new(job_id.to_string(), receiver))
    }

    /// Events of every job.
    pub fn subscribe_all(&self) -> broadcast::Receiver<DownloadEvent> {
        self.inner.events.subscribe()
    }

    /// Cancels every active job and signals any process still alive.
    /// Returns how many jobs were canceled.
    pub async fn shutdown(&self) -> usize {
        let mut canceled = 0;
        for job in self.get_active_downloads().await {
            if self.cancel(&job.id).await {
                canceled += 1;
            }
        }

        let signaled = self.inner.supervisor.kill_all().await;
        info!(canceled, signaled, "Download manager shut down");
        canceled
    }
}

impl ManagerInner {
    async fn entry(&self, job_id: &str) -> Option<Arc<Mutex<JobEntry>>> {
        self.registry.read().await.jobs.get(job_id).cloned()
    }

    /// Sends an event to the job's subscribers and the global channel.
    fn publish(&self, entry: &mut JobEntry, kind: DownloadEventKind) {
        let event = DownloadEvent::new(entry.job.id.clone(), kind);
        let terminal = event.is_terminal();

        // No receivers is fine
        if let Some(tx) = &entry.events {
            let _ = tx.send(event.clone());
        }
        let _ = self.events.send(event);

        if terminal {
            entry.events = None;
        }
    }

    fn record_terminal(&self, job: &Job) {
        let result = match job.status {
            JobStatus::Completed => {
                metrics::DOWNLOADS_COMPLETED.inc();
                "completed"
            }
            JobStatus::Error => {
                metrics::DOWNLOADS_FAILED.inc();
                "error"
            }
            JobStatus::Canceled => {
                metrics::DOWNLOADS_CANCELED.inc();
                "canceled"
            }
            JobStatus::Pending | JobStatus::Downloading => return,
        };

        if let Some(secs) = job.elapsed_secs() {
            metrics::DOWNLOAD_DURATION
                .with_label_values(&[result])
                .observe(secs);
        }
    }

    /// Fails a job whose `start` call went away before its process was registered.
    async fn abandon_start(&self, job_id: &str) {
        let Some(slot) = self.entry(job_id).await else {
            return;
        };
        let mut entry = slot.lock().await;
        debug!(job_id = %job_id, status = %entry.job.status, "Start of download abandoned");
        self.fail(&mut entry, "download start was abandoned".to_string());
    }

    fn fail(&self, entry: &mut JobEntry, message: String) {
        if !entry.job.mark_failed(message.clone()) {
            return;
        }
        warn!(job_id = %entry.job.id, error = %message, "Download failed");
        self.record_terminal(&entry.job);
        self.publish(entry, DownloadEventKind::Error { message });
    }
}

#[async_trait]
impl ProcessObserver for ManagerInner {
    async fn on_output_line(&self, job_id: &str, line: String) {
        let Some(sample) = parse_progress_line(&line) else {
            trace!(job_id = %job_id, line = %line, "Downloader output");
            return;
        };
        let Some(slot) = self.entry(job_id).await else {
            return;
        };

        let mut entry = slot.lock().await;
        let Some(published) = entry.job.apply_sample(&sample) else {
            return;
        };
        metrics::PROGRESS_SAMPLES.inc();
        self.publish(&mut entry, DownloadEventKind::Progress(published));
    }

    async fn on_exit(&self, job_id: &str, exit: ProcessExit) {
        let Some(slot) = self.entry(job_id).await else {
            warn!(job_id = %job_id, "Exit for unknown download");
            return;
        };

        let mut entry = slot.lock().await;
        entry.process = None;

        if entry.job.status.is_terminal() {
            debug!(
                job_id = %job_id,
                status = %entry.job.status,
                exit = ?exit,
                "Ignoring exit of finished download"
            );
            return;
        }

        match exit {
            ProcessExit::Success => {
                entry.job.mark_completed();
                let final_path = entry.job.output_path();
                info!(job_id = %job_id, path = %final_path.display(), "Download completed");
                self.record_terminal(&entry.job);
                self.publish(&mut entry, DownloadEventKind::Completed { final_path });
            }
            ProcessExit::Failure { code, message } => {
                let message = DownloadError::ProcessFailure { code, message }.to_string();
                self.fail(&mut entry, message);
            }
            ProcessExit::Terminated => {
                self.fail(&mut entry, "download process was terminated".to_string());
            }
        }
    }
}

/// Fails the job if dropped before `disarm`, which happens when the future of
/// `start` is dropped while the process is being launched.
struct PendingStart {
    inner: Option<Arc<ManagerInner>>,
    job_id: String,
}

impl PendingStart {
    fn new(inner: Arc<ManagerInner>, job_id: String) -> Self {
        Self {
            inner: Some(inner),
            job_id,
        }
    }

    fn disarm(mut self) {
        self.inner = None;
    }
}

impl Drop for PendingStart {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        let job_id = std::mem::take(&mut self.job_id);

        // The job lock may still be held by the dropped future, so finish later
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    inner.abandon_start(&job_id).await;
                });
            }
            Err(_) => {
                warn!(job_id = %job_id, "Abandoned download start left pending, no runtime");
            }
        }
    }
}

fn validate_filename(filename: &str) -> Result<(), DownloadError> {
    if filename.trim().is_empty() {
        return Err(DownloadError::invalid_request("filename must not be empty"));
    }
    let mut components = Path::new(filename).components();
    let plain =
        matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
    if !plain || filename.contains(['/', '\\']) {
        return Err(DownloadError::invalid_request(format!(
            "filename must be a plain file name: {}",
            filename
        )));
    }
    Ok(())
}
