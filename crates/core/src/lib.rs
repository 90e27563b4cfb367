pub mod config;
pub mod download;
pub mod format;
pub mod metrics;
pub mod process;
pub mod progress;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DownloaderConfig,
    EventsConfig, LogFormat, LoggingConfig, ServerConfig,
};
pub use download::{
    DownloadError, DownloadEvent, DownloadEventKind, DownloadManager, DownloadRequest, Job,
    JobStatus, JobSubscription, ManagerOptions,
};
pub use format::{select_default_format, FormatDescriptor, FormatProber, ProbeError, YtDlpProber};
pub use process::{
    CommandBackend, LaunchSpec, ProcessBackend, ProcessExit, ProcessSupervisor, SupervisorError,
};
pub use progress::{parse_progress_line, ProgressSample};
pub use source::{classify_url, validate_url, SourceKind};
