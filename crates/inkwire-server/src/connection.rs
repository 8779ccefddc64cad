//! WebSocket connection handling.
//!
//! Each connection moves through `PendingHandshake -> Active -> Closed`. The
//! handshake is the `userId` query parameter; without one the socket is
//! closed straight away and never joins a group.

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use inkwire_core::protocol::peek_event;
use inkwire_core::sync::USER_ID_PARAM;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::hub::InboundEvent;
use crate::routing::{ConnectionId, RoutingId};

/// Close reason sent when the handshake carries no routing id.
pub const MISSING_USER_ID: &str = "missing userId";

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HandshakeParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Drive one connection from handshake to close.
async fn handle_socket(mut socket: WebSocket, params: HandshakeParams, state: AppState) {
    let AppState {
        hub,
        outbound_capacity,
    } = state;
    let conn = ConnectionId::new();

    let Some(routing_id) = RoutingId::from_handshake(params.user_id.as_deref()) else {
        warn!("Rejecting connection {}: no {} in handshake", conn, USER_ID_PARAM);
        let close = Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: MISSING_USER_ID.into(),
        }));
        let _ = socket.send(close).await;
        return;
    };

    let (outbound, mut outbound_rx) = mpsc::channel(outbound_capacity.max(1));
    if hub.join(conn, routing_id.clone(), outbound).await.is_err() {
        warn!("Relay hub unavailable, dropping connection {}", conn);
        return;
    }
    info!("Connection {} active for {}", conn, routing_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Frames from this client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match peek_event(&text) {
                        Ok(Some(kind)) => {
                            if hub.event(conn, InboundEvent::relay(kind, text)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => debug!("Ignoring unrelayed event from {}", conn),
                        Err(e) => warn!("Malformed frame from {}: {}", conn, e),
                    },
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Ignoring {} byte binary frame from {}", data.len(), conn);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ping/pong are answered by the transport
                    Some(Err(e)) => {
                        // Only a real close ends the connection; a dead
                        // transport yields `None` on the next read
                        warn!("WebSocket error for {}: {}", conn, e);
                    }
                }
            }

            // Frames relayed from peers
            frame = outbound_rx.recv() => {
                match frame {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = hub.disconnect(conn).await;
    info!("Connection closed: {}", conn);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_params() {
        let params: HandshakeParams = serde_json::from_str(r#"{"userId":"42"}"#).unwrap();
        assert_eq!(params.user_id.as_deref(), Some("42"));

        let params: HandshakeParams = serde_json::from_str("{}").unwrap();
        assert!(params.user_id.is_none());
    }
}
