//! Parsing of the downloader's line-oriented progress output.
//!
//! yt-dlp reports progress as lines such as
//! `[download]  42.3% of ~ 120.50MiB at    2.50MiB/s ETA 00:42`, interleaved with
//! unrelated log output. `parse_progress_line` turns the former into a
//! `ProgressSample` and ignores the latter.

mod parser;

pub use parser::{parse_progress_line, ProgressSample};
