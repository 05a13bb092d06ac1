//! The hub WebSocket endpoint.
//!
//! Each accepted socket gets a fresh connection ID, an outbound channel
//! in the connection map, and a registry row (when authenticated). The
//! inbound loop dispatches `Reply` frames to the correlator; errors on
//! individual frames are logged and never tear down sibling processing.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use backchannel_core::{ConnectionId, Frame, UserId};
use backchannel_registry::ConnectionStore;

use crate::connections::OUTBOUND_BUFFER;
use crate::state::HubState;

/// WebSocket connection handler.
///
/// Authenticates the upgrade request through the gateway's seam.
/// Anonymous sockets are permitted but invisible to the registry.
pub async fn hub_socket<S>(
    ws: WebSocketUpgrade,
    State(state): State<HubState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: ConnectionStore + 'static,
{
    let user_id = state.auth.authenticate(&headers);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    ws.on_upgrade(move |socket| serve_connection(state, socket, user_id, user_agent))
}

/// Drive one connection from upgrade to close.
async fn serve_connection<S>(
    state: HubState<S>,
    socket: WebSocket,
    user_id: Option<UserId>,
    user_agent: Option<String>,
) where
    S: ConnectionStore + 'static,
{
    let connection_id = ConnectionId::generate();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER);

    // Addressable first, registered second: a frame fanned out between
    // the two steps is delivered rather than dropped.
    state
        .connections
        .register(connection_id.clone(), outbound_tx);

    if let Err(e) = state
        .hub
        .handle_open(user_id.as_ref(), &connection_id, user_agent.as_deref())
        .await
    {
        tracing::error!(
            connection_id = %connection_id,
            error = %e,
            "Failed to register connection; dropping the socket"
        );
        state.connections.deregister(&connection_id);
        return;
    }

    tracing::info!(
        connection_id = %connection_id,
        user_id = ?user_id.as_ref().map(ToString::to_string),
        "WebSocket connection established"
    );

    let (mut sink, mut source) = socket.split();

    let outbound = async {
        while let Some(frame) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode outbound frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    };

    let inbound = async {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    handle_frame(&state, &connection_id, &text);
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "WebSocket read ended"
                    );
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = outbound => {}
        () = inbound => {}
    }

    state.connections.deregister(&connection_id);
    if let Err(e) = state
        .hub
        .handle_close(user_id.as_ref(), &connection_id)
        .await
    {
        tracing::error!(
            connection_id = %connection_id,
            error = %e,
            "Failed to deregister connection"
        );
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Dispatch one inbound frame. Parse and dispatch errors are contained
/// to the frame.
fn handle_frame<S>(state: &HubState<S>, connection_id: &ConnectionId, text: &str)
where
    S: ConnectionStore,
{
    match serde_json::from_str::<Frame>(text) {
        Ok(Frame::Reply {
            request_id,
            response,
        }) => {
            // First reply wins; the hub logs dropped stragglers.
            state.hub.complete(&request_id, response);
        }
        Ok(Frame::Call { request_id, .. }) => {
            tracing::warn!(
                connection_id = %connection_id,
                request_id = %request_id,
                "Ignoring client-initiated call frame"
            );
        }
        Ok(Frame::Event { .. }) => {
            tracing::warn!(
                connection_id = %connection_id,
                "Ignoring client-originated event frame"
            );
        }
        Err(e) => {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Dropping unparseable frame"
            );
        }
    }
}
