//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the downloader binary so download lifecycles can be
//! exercised end to end without spawning real processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediamine_core::testing::{fixtures, MockFormatProber, MockProcessBackend, MockScript};
//!
//! let backend = MockProcessBackend::new();
//! let prober = MockFormatProber::with_formats(fixtures::youtube_formats());
//!
//! // Script the next download
//! backend.push_script(MockScript::lines(
//!     [fixtures::progress_line(50.0), fixtures::progress_line(100.0)],
//!     ProcessExit::Success,
//! )).await;
//! ```

mod mock_format_prober;
mod mock_process_backend;

pub use mock_format_prober::MockFormatProber;
pub use mock_process_backend::{MockProcessBackend, MockProcessController, MockScript};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::download::DownloadRequest;
    use crate::format::FormatDescriptor;

    /// A format carrying both video and audio.
    pub fn muxed_format(
        format_id: &str,
        resolution: &str,
        filesize: Option<u64>,
    ) -> FormatDescriptor {
        let mut format = FormatDescriptor::new(format_id, "mp4", resolution)
            .with_codecs("avc1.64001F", "mp4a.40.2");
        format.filesize = filesize;
        format
    }

    /// A video-only format.
    pub fn video_only_format(format_id: &str, resolution: &str, filesize: u64) -> FormatDescriptor {
        FormatDescriptor::new(format_id, "mp4", resolution)
            .with_codecs("avc1.640028", "none")
            .with_filesize(filesize)
    }

    /// An audio-only format.
    pub fn audio_only_format(format_id: &str, filesize: u64) -> FormatDescriptor {
        FormatDescriptor::new(format_id, "webm", "audio only")
            .with_codecs("none", "opus")
            .with_filesize(filesize)
    }

    /// A typical mix of formats for a YouTube video. The default pick is "22".
    pub fn youtube_formats() -> Vec<FormatDescriptor> {
        vec![
            audio_only_format("251", 3_400_000),
            muxed_format("18", "640x360", Some(12_000_000)),
            video_only_format("137", "1920x1080", 90_000_000),
            muxed_format("22", "1280x720", Some(40_000_000)),
        ]
    }

    /// A downloader progress line for `percent`.
    pub fn progress_line(percent: f64) -> String {
        format!(
            "[download] {:>5.1}% of   10.00MiB at    1.00MiB/s ETA 00:05",
            percent
        )
    }

    /// A download request for `url` with an explicit format and destination.
    pub fn download_request(url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            format: Some("best".to_string()),
            destination_path: Some(PathBuf::from("/tmp/mediamine-test")),
            filename: "video.mp4".to_string(),
        }
    }
}
