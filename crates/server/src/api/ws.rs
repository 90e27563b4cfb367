//! WebSocket stream of download events.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use mediamine_core::{DownloadEvent, DownloadEventKind, JobSubscription};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::error::download_error;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Stream only this job, closing after its terminal event
    pub job_id: Option<String>,
}

/// Where a connection's events come from.
enum EventFeed {
    All(broadcast::Receiver<DownloadEvent>),
    Job(JobSubscription),
}

impl EventFeed {
    async fn next(&mut self) -> Option<DownloadEvent> {
        match self {
            EventFeed::All(rx) => loop {
                match rx.recv().await {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} events", n);
                        WS_LAG_EVENTS.inc();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event channel closed");
                        return None;
                    }
                }
            },
            EventFeed::Job(subscription) => subscription.recv().await,
        }
    }

    /// Whether the stream ends by itself.
    fn is_finite(&self) -> bool {
        matches!(self, EventFeed::Job(_))
    }
}

fn event_type(event: &DownloadEvent) -> &'static str {
    match event.kind {
        DownloadEventKind::Progress(_) => "progress",
        DownloadEventKind::Completed { .. } => "completed",
        DownloadEventKind::Error { .. } => "error",
        DownloadEventKind::Canceled => "canceled",
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
) -> Response {
    let feed = match params.job_id {
        Some(job_id) => match state.manager().subscribe(&job_id).await {
            Ok(subscription) => EventFeed::Job(subscription),
            Err(e) => return download_error(e).into_response(),
        },
        None => EventFeed::All(state.manager().subscribe_all()),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, feed))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, mut feed: EventFeed) {
    let (mut sender, mut receiver) = socket.split();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = feed.next().await {
            WS_MESSAGES_SENT.with_label_values(&[event_type(&event)]).inc();

            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        return;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize DownloadEvent: {}", e);
                }
            }
        }

        if feed.is_finite() {
            let _ = sender.send(Message::Close(None)).await;
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client requested close");
                    break;
                }
                Ok(Message::Text(text)) => {
                    // Clients are not expected to send anything
                    debug!("Received text message: {}", text.as_str());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}
