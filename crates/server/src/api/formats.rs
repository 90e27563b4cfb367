//! Format listing API.

use axum::{extract::State, Json};
use mediamine_core::{select_default_format, DownloadError, FormatDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{download_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchFormatsBody {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatDescriptor>,
    /// Format id picked when the caller does not choose one
    pub default_format: String,
}

/// List the formats available for a URL
pub async fn fetch_formats(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchFormatsBody>,
) -> Result<Json<FormatsResponse>, ApiError> {
    let formats = state
        .manager()
        .fetch_formats(&body.url)
        .await
        .map_err(download_error)?;

    let default_format = select_default_format(&formats)
        .map(|format| format.format_id.clone())
        .map_err(|_| {
            download_error(DownloadError::NoFormatsAvailable {
                url: body.url.clone(),
            })
        })?;

    Ok(Json(FormatsResponse {
        formats,
        default_format,
    }))
}
