//! Chat relay — transcript append and room fan-out.
//!
//! DESIGN
//! ======
//! The relay appends the line to the room's in-memory transcript and fans
//! `NEW_MESSAGE` out to every roster member, sender included. Durable
//! persistence is fire-and-forget through the optional `TranscriptStore`,
//! so a slow database never holds a room lock.

use tracing::{debug, warn};

use crate::message::{ChatMessage, ServerMessage};
use crate::services::lobby;
use crate::state::AppState;

/// Relay one chat line to `game`. Unknown rooms are a logged no-op.
pub async fn relay(state: &AppState, game: &str, message: ChatMessage) {
    let Some(shared) = lobby::room(state, game).await else {
        debug!(game, "chat for unknown room dropped");
        return;
    };

    {
        let mut room = shared.lock().await;
        room.transcript.push(message.clone());
        lobby::broadcast(&room, &ServerMessage::NewMessage { message: message.clone() });
    }

    if let Some(store) = &state.transcripts {
        let store = store.clone();
        let game = game.to_owned();
        tokio::spawn(async move {
            if let Err(e) = store.append(&game, &message).await {
                warn!(error = %e, game, "chat transcript append failed");
            }
        });
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
