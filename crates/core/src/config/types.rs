use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}

/// External downloader configuration (yt-dlp compatible binary)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Path to the downloader binary, looked up in PATH when relative
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,
    /// Destination used when a request does not name one
    #[serde(default = "default_destination")]
    pub default_destination: PathBuf,
    /// Extra arguments appended to every download invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Format probe timeout in seconds (default: 60)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            default_destination: default_destination(),
            extra_args: Vec::new(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_destination() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_probe_timeout() -> u64 {
    60
}

/// Event channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Capacity of the global and per-job event channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000

[downloader]
binary_path = "/opt/yt-dlp"
default_destination = "/srv/media"
extra_args = ["--no-part", "--restrict-filenames"]
probe_timeout_secs = 30

[events]
channel_capacity = 64

[logging]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.downloader.binary_path.to_str().unwrap(), "/opt/yt-dlp");
        assert_eq!(config.downloader.extra_args.len(), 2);
        assert_eq!(config.downloader.probe_timeout_secs, 30);
        assert_eq!(config.events.channel_capacity, 64);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_deserialize_with_default_server() {
        let toml = r#"
[downloader]
binary_path = "yt-dlp"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_default_downloader() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.downloader.binary_path.to_str().unwrap(), "yt-dlp");
        assert_eq!(
            config.downloader.default_destination.to_str().unwrap(),
            "downloads"
        );
        assert!(config.downloader.extra_args.is_empty());
        assert_eq!(config.downloader.probe_timeout_secs, 60);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_log_format_fails() {
        let toml = r#"
[logging]
format = "xml"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
