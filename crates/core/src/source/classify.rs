use serde::{Deserialize, Serialize};
use url::Url;

/// Container extensions treated as a raw, directly downloadable video file.
pub const DIRECT_VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "mkv", "mov", "avi", "m4v", "flv", "ogv", "wmv", "3gp",
];

/// Where a video URL points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// youtube.com (any subdomain) or youtu.be.
    Youtube,
    /// A plain file whose path ends in a known video container extension.
    Direct,
    /// Anything else the downloader may or may not understand.
    Other,
}

impl SourceKind {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Youtube => "youtube",
            SourceKind::Direct => "direct",
            SourceKind::Other => "other",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true iff `url` is an absolute `http` or `https` URL.
pub fn validate_url(url: &str) -> bool {
    parse_http_url(url).is_some()
}

/// Classifies a URL by host and path.
///
/// Only meaningful for URLs accepted by [`validate_url`]; anything that does not
/// parse falls through to [`SourceKind::Other`].
pub fn classify_url(url: &str) -> SourceKind {
    let Some(parsed) = parse_http_url(url) else {
        return SourceKind::Other;
    };

    if parsed.host_str().is_some_and(is_youtube_host) {
        return SourceKind::Youtube;
    }

    if has_direct_video_extension(&parsed) {
        return SourceKind::Direct;
    }

    SourceKind::Other
}

fn parse_http_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Some(parsed),
        _ => None,
    }
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be"
}

fn has_direct_video_extension(url: &Url) -> bool {
    let Some(last_segment) = url.path_segments().and_then(|mut s| s.next_back()) else {
        return false;
    };

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            DIRECT_VIDEO_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(validate_url("https://example.com/v.mp4"));
        assert!(validate_url("http://example.com/watch"));
        assert!(validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        assert!(!validate_url("ftp://example.com/v.mp4"));
        assert!(!validate_url("file:///home/user/v.mp4"));
        assert!(!validate_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(!validate_url("not-a-url"));
        assert!(!validate_url(""));
        assert!(!validate_url("/relative/path.mp4"));
        assert!(!validate_url("https://"));
    }

    #[test]
    fn test_classify_youtube() {
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            SourceKind::Youtube
        );
        assert_eq!(classify_url("https://youtu.be/dQw4w9WgXcQ"), SourceKind::Youtube);
        assert_eq!(
            classify_url("https://m.youtube.com/watch?v=abc"),
            SourceKind::Youtube
        );
        assert_eq!(classify_url("https://youtube.com/shorts/abc"), SourceKind::Youtube);
    }

    #[test]
    fn test_classify_lookalike_host_is_not_youtube() {
        assert_eq!(
            classify_url("https://notyoutube.com/watch?v=abc"),
            SourceKind::Other
        );
        assert_eq!(
            classify_url("https://youtube.com.evil.example/watch"),
            SourceKind::Other
        );
    }

    #[test]
    fn test_classify_direct() {
        assert_eq!(classify_url("https://example.com/video.mp4"), SourceKind::Direct);
        assert_eq!(classify_url("https://example.com/video.webm"), SourceKind::Direct);
        assert_eq!(
            classify_url("https://cdn.example.com/a/b/clip.MKV?token=1"),
            SourceKind::Direct
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify_url("https://vimeo.com/123456"), SourceKind::Other);
        assert_eq!(classify_url("https://example.com/"), SourceKind::Other);
        assert_eq!(classify_url("https://example.com/archive.zip"), SourceKind::Other);
        assert_eq!(classify_url("https://example.com/.mp4"), SourceKind::Other);
    }

    #[test]
    fn test_source_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SourceKind::Youtube).unwrap();
        assert_eq!(json, "\"youtube\"");
        assert_eq!(SourceKind::Direct.to_string(), "direct");
    }
}
