//! Default format selection policy.

use super::error::ProbeError;
use super::types::FormatDescriptor;

/// Picks the format offered by default.
///
/// Formats that mux both audio and video are preferred, the largest declared size
/// winning (unsized formats count as zero, earlier entries win exact ties). When no
/// format has both streams, the first entry is returned as the prober ordered it.
///
/// An empty list is rejected rather than answered with an invented descriptor.
pub fn select_default_format(
    formats: &[FormatDescriptor],
) -> Result<&FormatDescriptor, ProbeError> {
    let first = formats.first().ok_or(ProbeError::NoFormats)?;

    let best_muxed = formats
        .iter()
        .filter(|f| f.has_audio_and_video())
        .fold(None::<&FormatDescriptor>, |best, candidate| match best {
            Some(current) if candidate.filesize.unwrap_or(0) <= current.filesize.unwrap_or(0) => {
                Some(current)
            }
            _ => Some(candidate),
        });

    Ok(best_muxed.unwrap_or(first))
}
