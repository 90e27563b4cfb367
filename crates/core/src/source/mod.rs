//! URL validation and source classification.
//!
//! Everything here is pure: no I/O, no allocation beyond URL parsing.

mod classify;

pub use classify::{classify_url, validate_url, SourceKind, DIRECT_VIDEO_EXTENSIONS};
