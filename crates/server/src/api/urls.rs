//! URL validation API.

use axum::{extract::State, Json};
use mediamine_core::SourceKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateUrlBody {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateUrlResponse {
    pub is_valid: bool,
    /// Present only for valid URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
}

/// Validate a URL and classify where it points to
pub async fn validate_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ValidateUrlBody>,
) -> Json<ValidateUrlResponse> {
    let manager = state.manager();
    let is_valid = manager.validate_url(&body.url);
    let source = is_valid.then(|| manager.classify_url(&body.url));
    Json(ValidateUrlResponse { is_valid, source })
}
