//! Mapping of core errors to HTTP responses.

use axum::{http::StatusCode, Json};
use mediamine_core::{DownloadError, ProbeError};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Status code for a download error.
pub fn status_for(error: &DownloadError) -> StatusCode {
    match error {
        DownloadError::InvalidUrl { .. } | DownloadError::InvalidRequest { .. } => {
            StatusCode::BAD_REQUEST
        }
        DownloadError::NoFormatsAvailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DownloadError::UnknownJob { .. } => StatusCode::NOT_FOUND,
        DownloadError::SpawnFailure { .. } => StatusCode::BAD_GATEWAY,
        DownloadError::Probe(ProbeError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        DownloadError::Probe(_) => StatusCode::BAD_GATEWAY,
        DownloadError::ProcessFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn download_error(error: DownloadError) -> ApiError {
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&DownloadError::InvalidUrl {
                url: "x".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DownloadError::invalid_request("filename must not be empty")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DownloadError::NoFormatsAvailable {
                url: "x".to_string()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&DownloadError::unknown_job("missing")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&DownloadError::spawn_failure("job", "not found")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DownloadError::Probe(ProbeError::Timeout { timeout_secs: 60 })),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&DownloadError::Probe(ProbeError::failed("ERROR: Unsupported URL"))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_body_carries_message() {
        let (status, Json(body)) = download_error(DownloadError::unknown_job("abc"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Unknown download: abc");
    }
}
