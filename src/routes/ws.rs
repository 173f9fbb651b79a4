//! WebSocket handler — connection registry and message router.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by message type
//! - Broadcast messages from room peers → forward to this socket
//!
//! Handlers mutate room state and broadcast under the room lock; the only
//! thing this layer sends itself is the `ERROR` reply owed to the
//! requester. Malformed frames and unknown types are logged and dropped —
//! the connection stays open and no room is touched.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `CONNECTED` with the session id
//! 2. Client sends frames → exhaustive dispatch
//! 3. Close → lobby disconnect handler removes the connection everywhere

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::message::{ClientMessage, ServerMessage};
use crate::services::{chat, game, lobby};
use crate::state::{AppState, ConnId};

/// Outbound channel depth per connection. A peer this far behind starts
/// losing broadcasts rather than stalling the room.
const OUTBOUND_BUFFER: usize = 256;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id: ConnId = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let welcome = ServerMessage::Connected { session: conn_id };
    if send_message(&mut socket, &welcome).await.is_err() {
        return;
    }
    info!(%conn_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        if let Some(reply) = process_inbound_text(&state, conn_id, &tx, &text).await {
                            let _ = send_message(&mut socket, &reply).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(outbound) = rx.recv() => {
                if send_message(&mut socket, &outbound).await.is_err() {
                    break;
                }
            }
        }
    }

    lobby::disconnect(&state, conn_id).await;
    info!(%conn_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and route one inbound text frame. Returns the reply owed to the
/// sender, if any. Split from the socket loop so tests can drive dispatch
/// without a real websocket.
async fn process_inbound_text(
    state: &AppState,
    conn_id: ConnId,
    tx: &mpsc::Sender<ServerMessage>,
    text: &str,
) -> Option<ServerMessage> {
    let msg = parse_client_message(conn_id, text)?;

    match msg {
        ClientMessage::JoinLobby { game, player, mode } => {
            match lobby::join_room(state, &game, &player, mode, conn_id, tx.clone()).await {
                Ok(()) => None,
                Err(e) => Some(ServerMessage::Error { message: e.to_string() }),
            }
        }
        ClientMessage::LeaveLobby { game } => {
            lobby::leave_room(state, &game, conn_id).await;
            None
        }
        ClientMessage::SelectOpponent { game, player, opponent } => {
            lobby::select_opponent(state, &game, &player, &opponent).await;
            None
        }
        ClientMessage::PlayerReady { game, player } => {
            lobby::set_ready(state, &game, &player).await;
            None
        }
        ClientMessage::StartGame { game } => {
            lobby::start_game(state, &game).await;
            None
        }
        ClientMessage::MakeMove { game, player, mv } => {
            game::apply_move(state, &game, &player, mv.row, mv.col).await;
            None
        }
        ClientMessage::SendMessage { game, message } => {
            chat::relay(state, &game, message).await;
            None
        }
    }
}

/// Parse one frame, distinguishing malformed JSON from an unrecognized
/// message type in the logs. Both are dropped.
fn parse_client_message(conn_id: ConnId, text: &str) -> Option<ClientMessage> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: malformed frame dropped");
            return None;
        }
    };

    match ClientMessage::deserialize(&value) {
        Ok(msg) => Some(msg),
        Err(e) => {
            let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("<missing>");
            warn!(%conn_id, kind, error = %e, "ws: unrecognized frame dropped");
            None
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let json = match serde_json::to_string(message) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize message");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
