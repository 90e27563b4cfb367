use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Downloader binary path is set
/// - Probe timeout and event channel capacity are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Downloader validation
    if config.downloader.binary_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "downloader.binary_path cannot be empty".to_string(),
        ));
    }

    if config.downloader.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "downloader.probe_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.events.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "events.channel_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}
