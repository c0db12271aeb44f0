//! WebSocket upgrade handler and message dispatch.
//!
//! Each connected client receives:
//! 1. A full [`WebSnapshot`](crate::WebSnapshot) on connect.
//! 2. Every [`WsMessage`] broadcast afterwards: panel events, log lines and
//!    a fresh snapshot after each applied command.
//!
//! Clients may send `set_parameter` and `submit` messages back.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use prompting::parameters::StoredValue;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::PanelHandle;
use crate::broadcast::WsMessage;

/// Shared state for WebSocket handlers.
#[derive(Clone)]
pub struct WsState {
    pub handle: PanelHandle,
}

/// GET /ws: WebSocket upgrade handler.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(ws_state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ws_state.handle))
}

fn snapshot_message(handle: &PanelHandle) -> WsMessage {
    WsMessage::Snapshot {
        data: handle.snapshot().to_json(),
    }
}

async fn handle_socket(socket: WebSocket, handle: PanelHandle) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before the first snapshot so nothing published in between is lost.
    let mut broadcast_rx = handle.subscribe();
    if ws_send(&mut sink, &snapshot_message(&handle)).await.is_err() {
        return;
    }
    debug!("WebSocket client connected");

    let resync = handle.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            let msg = match broadcast_rx.recv().await {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged by {n} messages, resending snapshot");
                    snapshot_message(&resync)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if ws_send(&mut sink, &msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&text, &handle).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!("WebSocket client disconnected");
    forward_task.abort();
}

/// A message received from a client.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    SetParameter {
        name: String,
        #[serde(default)]
        value: serde_json::Value,
    },
    Submit,
}

/// Apply a client message. Failures are logged; the panel reports them to
/// every client through its own events and the next snapshot.
async fn handle_client_message(text: &str, handle: &PanelHandle) {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        debug!("Ignoring malformed WebSocket message");
        return;
    };

    let result = match msg {
        ClientMessage::SetParameter { name, value } => handle
            .set_parameter(name, StoredValue::from_json(&value))
            .await
            .map(|_| ()),
        ClientMessage::Submit => handle.submit().await,
    };
    if let Err(e) = result {
        warn!("WebSocket command failed: {e}");
    }
}

/// Send a [`WsMessage`] as JSON text.
async fn ws_send(sink: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    sink.send(Message::Text(json.into())).await
}
