//! Download API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mediamine_core::{DownloadError, DownloadRequest, Job};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::error::{download_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ListDownloadsResponse {
    pub downloads: Vec<Job>,
    pub total: usize,
}

impl From<Vec<Job>> for ListDownloadsResponse {
    fn from(downloads: Vec<Job>) -> Self {
        Self {
            total: downloads.len(),
            downloads,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelDownloadResponse {
    pub id: String,
    /// False when the job was unknown or already finished
    pub canceled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a download
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job = state.manager().start(body).await.map_err(download_error)?;
    info!(job_id = %job.id, "Download requested via API");
    Ok((StatusCode::CREATED, Json(job)))
}

/// List every download, oldest first
pub async fn list_downloads(State(state): State<Arc<AppState>>) -> Json<ListDownloadsResponse> {
    Json(state.manager().get_all_downloads().await.into())
}

/// List pending and downloading jobs
pub async fn list_active_downloads(
    State(state): State<Arc<AppState>>,
) -> Json<ListDownloadsResponse> {
    Json(state.manager().get_active_downloads().await.into())
}

/// Get a download by ID
pub async fn get_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .manager()
        .get_download(&id)
        .await
        .map(Json)
        .ok_or_else(|| download_error(DownloadError::unknown_job(id)))
}

/// Cancel a download. Idempotent.
pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<CancelDownloadResponse> {
    let canceled = state.manager().cancel(&id).await;
    Json(CancelDownloadResponse { id, canceled })
}
