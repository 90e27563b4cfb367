//! Format discovery and default format selection.
//!
//! The `FormatProber` trait abstracts the external tool that lists the encodings
//! available for a URL. `YtDlpProber` implements it by running `yt-dlp -J` and
//! reading its JSON dump; `select_default_format` picks the option offered to the
//! user before they choose.
//!
//! # Example
//!
//! ```ignore
//! use mediamine_core::format::{select_default_format, FormatProber, YtDlpProber};
//!
//! let prober = YtDlpProber::new(DownloaderConfig::default());
//! let formats = prober.probe("https://youtu.be/dQw4w9WgXcQ").await?;
//! let default = select_default_format(&formats)?;
//! println!("{} ({})", default.format_id, default.resolution);
//! ```

mod error;
mod selector;
mod traits;
mod types;
mod ytdlp;

pub use error::ProbeError;
pub use selector::select_default_format;
pub use traits::FormatProber;
pub use types::{FormatDescriptor, NO_CODEC};
pub use ytdlp::YtDlpProber;
