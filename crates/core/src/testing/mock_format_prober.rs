//! Mock format prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::format::{FormatDescriptor, FormatProber, ProbeError};

/// Mock implementation of the FormatProber trait.
///
/// Returns the formats registered for a URL, falling back to a default list.
/// Probed URLs are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockFormatProber {
    /// Pre-configured formats by URL.
    formats: Arc<RwLock<HashMap<String, Vec<FormatDescriptor>>>>,
    /// Formats for URLs without an entry.
    default_formats: Arc<RwLock<Vec<FormatDescriptor>>>,
    /// If set, the next probe will fail with this error.
    next_error: Arc<RwLock<Option<ProbeError>>>,
    /// URLs probed so far.
    probed: Arc<RwLock<Vec<String>>>,
    /// Whether `validate` reports a missing binary.
    unavailable: Arc<RwLock<bool>>,
}

impl MockFormatProber {
    /// Create a new mock prober that returns no formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock prober with the given default formats.
    pub fn with_formats(formats: Vec<FormatDescriptor>) -> Self {
        Self {
            default_formats: Arc::new(RwLock::new(formats)),
            ..Self::default()
        }
    }

    /// Set the formats returned for a specific URL.
    pub async fn set_formats(&self, url: &str, formats: Vec<FormatDescriptor>) {
        self.formats.write().await.insert(url.to_string(), formats);
    }

    /// Set the formats returned for URLs without an entry.
    pub async fn set_default_formats(&self, formats: Vec<FormatDescriptor>) {
        *self.default_formats.write().await = formats;
    }

    /// Configure the next probe to fail with the given error.
    pub async fn set_next_error(&self, error: ProbeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make `validate` fail as if the binary were missing.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// URLs probed so far, in order.
    pub async fn probed_urls(&self) -> Vec<String> {
        self.probed.read().await.clone()
    }
}

#[async_trait]
impl FormatProber for MockFormatProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, url: &str) -> Result<Vec<FormatDescriptor>, ProbeError> {
        self.probed.write().await.push(url.to_string());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if let Some(formats) = self.formats.read().await.get(url) {
            return Ok(formats.clone());
        }

        Ok(self.default_formats.read().await.clone())
    }

    async fn validate(&self) -> Result<(), ProbeError> {
        if *self.unavailable.read().await {
            return Err(ProbeError::BinaryNotFound {
                path: PathBuf::from("mock-yt-dlp"),
            });
        }
        Ok(())
    }
}
