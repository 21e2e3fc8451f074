//! WebSocket Connection Handler
//!
//! Upgrades HTTP requests and pumps frames between the socket and a
//! [`Session`]. Each connection gets a writer task draining its outbound
//! queue; the upgrade task reads and hands text frames to the session until
//! the peer leaves, the writer stops, or the gateway evicts the connection.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::session::Session;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// WebSocket upgrade handler
///
/// Requests carrying an `Origin` outside the allow-list are refused before
/// the upgrade. Requests without one (native clients) are accepted.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let origin = origin
            .to_str()
            .map_err(|_| AppError::Forbidden("Origin not allowed".into()))?;

        if !origin_allowed(&state.settings.cors.allowed_origins, origin) {
            tracing::warn!(origin = %origin, "Rejected WebSocket upgrade from disallowed origin");
            return Err(AppError::Forbidden("Origin not allowed".into()));
        }
    }

    let limits = &state.settings.websocket;
    Ok(ws
        .max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state)))
}

/// An empty allow-list admits every origin
pub fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == origin)
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let ctx = state.sessions.clone();
    let (id, mut rx) = ctx.gateway.connect();
    let Some(evicted) = ctx.gateway.eviction(id) else {
        return;
    };
    let mut session = Session::new(id, ctx);

    tracing::debug!(connection_id = %id, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();

    // Ends when the registry drops the connection's sender or the peer
    // stops accepting writes.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(connection_id = %id, error = %e, "Failed to serialize frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = session.handle_text(text.as_str()).await {
                            tracing::debug!(connection_id = %id, error = %e, "Session ended");
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(connection_id = %id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %id, "Connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = &mut writer => {
                tracing::debug!(connection_id = %id, "Writer finished, closing connection");
                break;
            }

            _ = evicted.cancelled() => {
                tracing::debug!(connection_id = %id, "Connection evicted, closing socket");
                break;
            }
        }
    }

    drop(session);
    writer.abort();
}
