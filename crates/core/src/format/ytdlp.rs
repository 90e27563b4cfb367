//! yt-dlp based format prober.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::DownloaderConfig;

use super::error::ProbeError;
use super::traits::FormatProber;
use super::types::{FormatDescriptor, NO_CODEC};

/// Probes formats by running `yt-dlp -J` and reading the JSON dump.
pub struct YtDlpProber {
    config: DownloaderConfig,
}

impl YtDlpProber {
    /// Creates a new prober with the given downloader configuration.
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Creates a prober with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(DownloaderConfig::default())
    }

    /// Probe flags, then the configured extra arguments, then the URL.
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        // The URL can never be taken for an option
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Parses the info dict printed by `yt-dlp -J`.
    fn parse_info_json(output: &str) -> Result<Vec<FormatDescriptor>, ProbeError> {
        #[derive(Deserialize)]
        struct InfoDict {
            #[serde(default)]
            formats: Option<Vec<RawFormat>>,
            // Direct links sometimes come back without a formats array
            format_id: Option<String>,
            ext: Option<String>,
        }

        #[derive(Deserialize)]
        struct RawFormat {
            format_id: String,
            ext: Option<String>,
            resolution: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            filesize: Option<f64>,
            filesize_approx: Option<f64>,
            vcodec: Option<String>,
            acodec: Option<String>,
            format_note: Option<String>,
        }

        let info: InfoDict = serde_json::from_str(output)
            .map_err(|e| ProbeError::parse(format!("Failed to parse yt-dlp output: {}", e)))?;

        let raw_formats = match (info.formats, info.format_id) {
            (Some(formats), _) => formats,
            (None, Some(format_id)) => {
                return Ok(vec![FormatDescriptor::new(
                    format_id,
                    info.ext.unwrap_or_else(|| "unknown".to_string()),
                    "unknown",
                )])
            }
            (None, None) => Vec::new(),
        };

        let formats = raw_formats
            .into_iter()
            .map(|raw| {
                let resolution = raw.resolution.unwrap_or_else(|| {
                    match (raw.width, raw.height) {
                        (Some(w), Some(h)) => format!("{}x{}", w, h),
                        (None, Some(h)) => format!("{}p", h),
                        _ if raw.vcodec.as_deref() == Some(NO_CODEC) => "audio only".to_string(),
                        _ => "unknown".to_string(),
                    }
                });

                FormatDescriptor {
                    format_id: raw.format_id,
                    ext: raw.ext.unwrap_or_else(|| "unknown".to_string()),
                    resolution,
                    filesize: raw
                        .filesize
                        .or(raw.filesize_approx)
                        .filter(|size| *size >= 0.0)
                        .map(|size| size as u64),
                    vcodec: raw.vcodec,
                    acodec: raw.acodec,
                    format_note: raw.format_note,
                }
            })
            .collect();

        Ok(formats)
    }
}

#[async_trait]
impl FormatProber for YtDlpProber {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<Vec<FormatDescriptor>, ProbeError> {
        let child = Command::new(&self.config.binary_path)
            .args(self.build_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::BinaryNotFound {
                        path: self.config.binary_path.clone(),
                    }
                } else {
                    ProbeError::Io(e)
                }
            })?;

        // The child is killed if this future is dropped or the timeout fires
        let timeout_secs = self.config.probe_timeout_secs;
        let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout { timeout_secs })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("yt-dlp exited without output")
                .trim()
                .to_string();
            return Err(ProbeError::failed(reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let formats = Self::parse_info_json(&stdout)?;
        debug!(url = %url, count = formats.len(), "Probed formats");

        if formats.is_empty() {
            return Err(ProbeError::NoFormats);
        }

        Ok(formats)
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        let result = Command::new(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(ProbeError::failed(format!(
                "{} --version exited with code {:?}",
                self.config.binary_path.display(),
                output.status.code()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProbeError::BinaryNotFound {
                path: self.config.binary_path.clone(),
            }),
            Err(e) => Err(ProbeError::Io(e)),
        }
    }
}
