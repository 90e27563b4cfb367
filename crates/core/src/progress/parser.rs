use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static PERCENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[download\]\s+(\d+(?:\.\d+)?)%").unwrap());

static SPEED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\sat\s+(\d+(?:\.\d+)?)\s*([KMGT]?i?B)/s").unwrap());

static ETA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sETA\s+((?:\d+:)*\d+)").unwrap());

/// One parsed observation of download progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Completion percentage, clamped to 0.0 - 100.0.
    pub percent: f64,
    /// Current transfer rate, if the line reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_bytes_per_second: Option<f64>,
    /// Estimated seconds remaining, if the line reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}

/// Parses one line of downloader output.
///
/// Returns `None` for anything that is not a progress report. Missing or
/// `Unknown` speed and ETA fields leave the corresponding sample field empty
/// instead of rejecting the line. Carriage-return separated updates (terminal
/// redraws) are reduced to the last one.
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let line = line.rsplit('\r').find(|part| !part.trim().is_empty())?;

    let percent = PERCENT_REGEX
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())?
        .clamp(0.0, 100.0);

    let speed_bytes_per_second = SPEED_REGEX.captures(line).and_then(|caps| {
        let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let multiplier = unit_multiplier(caps.get(2)?.as_str())?;
        Some(value * multiplier)
    });

    let eta_seconds = ETA_REGEX
        .captures(line)
        .and_then(|caps| parse_clock(caps.get(1)?.as_str()));

    Some(ProgressSample {
        percent,
        speed_bytes_per_second,
        eta_seconds,
    })
}

fn unit_multiplier(unit: &str) -> Option<f64> {
    let multiplier = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };
    Some(multiplier)
}

/// Parses `SS`, `MM:SS` or `HH:MM:SS` into seconds.
fn parse_clock(clock: &str) -> Option<u64> {
    clock.split(':').try_fold(0u64, |acc, part| {
        let value = part.parse::<u64>().ok()?;
        acc.checked_mul(60)?.checked_add(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_progress_line() {
        let line = "[download]  42.3% of  120.50MiB at    2.50MiB/s ETA 00:42";
        let sample = parse_progress_line(line).unwrap();
        assert!((sample.percent - 42.3).abs() < 1e-9);
        assert_eq!(sample.speed_bytes_per_second, Some(2.5 * 1024.0 * 1024.0));
        assert_eq!(sample.eta_seconds, Some(42));
    }

    #[test]
    fn test_parse_approximate_size_and_fragments() {
        let sample = parse_progress_line(
            "[download]   7.0% of ~ 300.12MiB at  512.00KiB/s ETA 01:02:03 (frag 3/120)",
        )
        .unwrap();
        assert!((sample.percent - 7.0).abs() < 1e-9);
        assert_eq!(sample.speed_bytes_per_second, Some(512.0 * 1024.0));
        assert_eq!(sample.eta_seconds, Some(3723));
    }

    #[test]
    fn test_parse_unknown_speed_and_eta() {
        let line = "[download]   0.0% of   10.00MiB at  Unknown B/s ETA Unknown";
        let sample = parse_progress_line(line).unwrap();
        assert_eq!(sample.percent, 0.0);
        assert_eq!(sample.speed_bytes_per_second, None);
        assert_eq!(sample.eta_seconds, None);
    }

    #[test]
    fn test_parse_percent_only() {
        let sample = parse_progress_line("[download]  55%").unwrap();
        assert_eq!(sample.percent, 55.0);
        assert_eq!(sample.speed_bytes_per_second, None);
        assert_eq!(sample.eta_seconds, None);
    }

    #[test]
    fn test_parse_finished_line() {
        let sample =
            parse_progress_line("[download] 100% of   10.00MiB in 00:00:05 at 2.00MiB/s").unwrap();
        assert_eq!(sample.percent, 100.0);
        assert_eq!(sample.speed_bytes_per_second, Some(2.0 * 1024.0 * 1024.0));
        assert_eq!(sample.eta_seconds, None);
    }

    #[test]
    fn test_carriage_return_updates_use_last() {
        let line = concat!(
            "[download]  10.0% of 1.00MiB at 1.00KiB/s ETA 00:10\r",
            "[download]  20.0% of 1.00MiB at 2.00KiB/s ETA 00:05\r",
        );
        let sample = parse_progress_line(line).unwrap();
        assert_eq!(sample.percent, 20.0);
        assert_eq!(sample.eta_seconds, Some(5));
    }

    #[test]
    fn test_decimal_units() {
        let sample =
            parse_progress_line("[download]  1.5% of 2.00GB at 3.00MB/s ETA 10:00").unwrap();
        assert_eq!(sample.speed_bytes_per_second, Some(3e6));
        assert_eq!(sample.eta_seconds, Some(600));
    }

    #[test]
    fn test_non_progress_lines_are_ignored() {
        assert!(parse_progress_line("[youtube] dQw4w9WgXcQ: Downloading webpage").is_none());
        assert!(parse_progress_line("[download] Destination: /tmp/video.mp4").is_none());
        assert!(
            parse_progress_line("[download] /tmp/video.mp4 has already been downloaded").is_none()
        );
        assert!(parse_progress_line("[Merger] Merging formats into \"video.mp4\"").is_none());
        assert!(parse_progress_line("").is_none());
        assert!(parse_progress_line("\r\r").is_none());
    }

    #[test]
    fn test_never_panics_on_malformed_numbers() {
        let huge = "[download] 99999999999999999999999999999999999999.9% of x";
        assert!(parse_progress_line(huge).is_some());
        assert!(parse_progress_line("[download] .5% of 1MiB").is_none());
        let sample = parse_progress_line("[download]  5.0% at 1.0XB/s ETA 99999999999999999999:00");
        let sample = sample.unwrap();
        assert_eq!(sample.speed_bytes_per_second, None);
        assert_eq!(sample.eta_seconds, None);
    }

    #[test]
    fn test_percent_is_clamped() {
        let sample = parse_progress_line("[download] 250.0% of 1.00MiB").unwrap();
        assert_eq!(sample.percent, 100.0);
    }
}
