use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{downloads, formats, handlers, urls, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/ping", get(handlers::ping))
        .route("/config", get(handlers::get_config))
        // URLs and formats
        .route("/urls/validate", post(urls::validate_url))
        .route("/formats", post(formats::fetch_formats))
        // Downloads
        .route(
            "/downloads",
            post(downloads::start_download).get(downloads::list_downloads),
        )
        .route("/downloads/active", get(downloads::list_active_downloads))
        .route(
            "/downloads/{id}",
            get(downloads::get_download).delete(downloads::cancel_download),
        )
        // Event stream
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    // Prometheus scrape endpoint
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
