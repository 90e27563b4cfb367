//! Trait definitions for format probing.

use async_trait::async_trait;

use super::error::ProbeError;
use super::types::FormatDescriptor;

/// Lists the encodings an external tool can fetch for a URL.
///
/// Implementations return a fresh list on every call; nothing is cached. Dropping
/// the returned future must not leave the underlying process running.
#[async_trait]
pub trait FormatProber: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Probes `url` for its available formats, in the order the tool reports them.
    async fn probe(&self, url: &str) -> Result<Vec<FormatDescriptor>, ProbeError>;

    /// Validates that the prober is installed and runnable.
    async fn validate(&self) -> Result<(), ProbeError>;
}
