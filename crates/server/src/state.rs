use mediamine_core::{Config, DownloadManager};

/// Shared application state
pub struct AppState {
    config: Config,
    manager: DownloadManager,
}

impl AppState {
    pub fn new(config: Config, manager: DownloadManager) -> Self {
        Self { config, manager }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &DownloadManager {
        &self.manager
    }
}
