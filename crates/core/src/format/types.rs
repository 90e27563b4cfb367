//! Types for format discovery.

use serde::{Deserialize, Serialize};

/// Codec tag the prober uses to say a stream is absent.
pub const NO_CODEC: &str = "none";

/// One encoding option reported by the prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Identifier passed back to the downloader to select this format.
    pub format_id: String,
    /// Container extension (e.g. "mp4", "webm").
    pub ext: String,
    /// Human-readable resolution label (e.g. "1920x1080", "audio only").
    pub resolution: String,
    /// Declared file size in bytes, exact or approximate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// Video codec tag, `"none"` for audio-only formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    /// Audio codec tag, `"none"` for video-only formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    /// Free-form note from the prober (e.g. "1080p", "medium").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_note: Option<String>,
}

impl FormatDescriptor {
    /// Creates a descriptor with only the identifying fields set.
    pub fn new(
        format_id: impl Into<String>,
        ext: impl Into<String>,
        resolution: impl Into<String>,
    ) -> Self {
        Self {
            format_id: format_id.into(),
            ext: ext.into(),
            resolution: resolution.into(),
            filesize: None,
            vcodec: None,
            acodec: None,
            format_note: None,
        }
    }

    /// Sets the declared file size.
    pub fn with_filesize(mut self, bytes: u64) -> Self {
        self.filesize = Some(bytes);
        self
    }

    /// Sets the video and audio codec tags.
    pub fn with_codecs(mut self, vcodec: impl Into<String>, acodec: impl Into<String>) -> Self {
        self.vcodec = Some(vcodec.into());
        self.acodec = Some(acodec.into());
        self
    }

    /// Sets the prober note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.format_note = Some(note.into());
        self
    }

    /// Whether the format carries a video stream.
    pub fn has_video(&self) -> bool {
        is_present_codec(self.vcodec.as_deref())
    }

    /// Whether the format carries an audio stream.
    pub fn has_audio(&self) -> bool {
        is_present_codec(self.acodec.as_deref())
    }

    /// Whether the format muxes both audio and video.
    pub fn has_audio_and_video(&self) -> bool {
        self.has_video() && self.has_audio()
    }
}

fn is_present_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != NO_CODEC)
}
