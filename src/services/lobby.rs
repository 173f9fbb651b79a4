//! Lobby service — room lifecycle, pairing negotiation, and fan-out.
//!
//! DESIGN
//! ======
//! Rooms are created lazily on first join and destroyed when the roster
//! empties. Every state transition locks exactly one room: read invariants,
//! mutate, broadcast, release. The registry lock is held only to look up or
//! change map membership, never across a transition, so unrelated rooms
//! stay independent.
//!
//! The supported promotion path is mutual opponent selection: a session
//! starts when a room holds exactly two players who have selected each
//! other. `PLAYER_READY` is recorded but deprecated and never promotes.
//!
//! ERROR HANDLING
//! ==============
//! Joining with a taken name is the one rejection reported back to the
//! requester. Leaving a room one is not in, or acting on a room that no
//! longer exists, is a no-op.

use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::message::{BoardMode, ServerMessage};
use crate::services::game::{BoardConfig, GameSession};
use crate::state::{AppState, ConnId, PlayerHandle, Room, SharedRoom};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Player with this name is already in the lobby.")]
    NameTaken,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Look up a live room. Clones the handle under the registry read lock so
/// the caller locks the room itself without holding the registry.
pub async fn room(state: &AppState, game: &str) -> Option<SharedRoom> {
    let rooms = state.rooms.read().await;
    rooms.get(game).cloned()
}

/// Look up or create a room. The first joiner's `mode` fixes the board
/// shape; later requests inherit it.
async fn room_or_create(state: &AppState, game: &str, mode: Option<BoardMode>) -> SharedRoom {
    let mut rooms = state.rooms.write().await;
    rooms
        .entry(game.to_owned())
        .or_insert_with(|| {
            let board = mode.map_or(BoardConfig::FIVE_IN_A_ROW, BoardConfig::from);
            info!(game, dimension = board.dimension, "created room");
            SharedRoom::new(Mutex::new(Room::new(game, board)))
        })
        .clone()
}

/// Drop the room from the registry if its roster emptied. Re-checks under
/// the registry write lock so a join racing with the last leave wins.
async fn evict_if_empty(state: &AppState, game: &str) {
    let mut rooms = state.rooms.write().await;
    let Some(shared) = rooms.get(game) else {
        return;
    };
    if shared.lock().await.roster.is_empty() {
        rooms.remove(game);
        info!(game, "destroyed empty room");
    }
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a room, creating it if absent. Rejects a display name already on
/// the roster; on success broadcasts the updated roster to the whole room.
///
/// # Errors
///
/// Returns `LobbyError::NameTaken` if `player` is already present.
pub async fn join_room(
    state: &AppState,
    game: &str,
    player: &str,
    mode: Option<BoardMode>,
    conn: ConnId,
    tx: mpsc::Sender<ServerMessage>,
) -> Result<(), LobbyError> {
    let shared = room_or_create(state, game, mode).await;
    let mut room = shared.lock().await;

    if room.player(player).is_some() {
        debug!(game, player, "join rejected: name taken");
        return Err(LobbyError::NameTaken);
    }

    room.roster.push(PlayerHandle::new(player, conn, tx));
    info!(game, player, roster = room.roster.len(), "player joined room");

    broadcast(
        &room,
        &ServerMessage::LobbyUpdate { game: game.to_owned(), players: room.player_names() },
    );
    Ok(())
}

/// Leave a room explicitly. A connection not on the roster is a no-op.
pub async fn leave_room(state: &AppState, game: &str, conn: ConnId) {
    let Some(shared) = room(state, game).await else {
        return;
    };
    let removed = {
        let mut room = shared.lock().await;
        remove_connection(&mut room, conn)
    };
    if removed {
        evict_if_empty(state, game).await;
    }
}

/// Disconnect path: remove the connection from every room that holds it.
/// Invoked by the connection registry when a socket closes.
pub async fn disconnect(state: &AppState, conn: ConnId) {
    let entries: Vec<(String, SharedRoom)> = {
        let rooms = state.rooms.read().await;
        rooms.iter().map(|(id, r)| (id.clone(), r.clone())).collect()
    };

    for (game, shared) in entries {
        let removed = {
            let mut room = shared.lock().await;
            remove_connection(&mut room, conn)
        };
        if removed {
            evict_if_empty(state, &game).await;
        }
    }
}

/// Remove the handle owned by `conn`, tear down any live session, and
/// broadcast the shrunken roster. Returns whether anything was removed.
fn remove_connection(room: &mut Room, conn: ConnId) -> bool {
    let Some(index) = room.roster.iter().position(|p| p.conn == conn) else {
        return false;
    };
    let handle = room.roster.remove(index);
    info!(game = %room.id, player = %handle.name, remaining = room.roster.len(), "player left room");

    if room.session.is_some() {
        // Abandonment, not a win.
        info!(game = %room.id, "session abandoned by departure");
        room.reset_pairing();
    }

    broadcast(
        room,
        &ServerMessage::LobbyUpdate { game: room.id.clone(), players: room.player_names() },
    );
    true
}

// =============================================================================
// PAIRING
// =============================================================================

/// Record the requester's opponent choice, broadcast it, and promote the
/// room when the pairing-completion condition holds. Unknown rooms and
/// unknown requesters are no-ops.
pub async fn select_opponent(state: &AppState, game: &str, player: &str, opponent: &str) {
    let Some(shared) = room(state, game).await else {
        debug!(game, player, "opponent selection for unknown room ignored");
        return;
    };
    let mut room = shared.lock().await;

    let Some(handle) = room.player_mut(player) else {
        debug!(game, player, "opponent selection by non-member ignored");
        return;
    };
    handle.selected_opponent = Some(opponent.to_owned());
    info!(game, player, opponent, "opponent selected");

    broadcast(
        &room,
        &ServerMessage::OpponentSelected {
            game: game.to_owned(),
            player: player.to_owned(),
            opponent: opponent.to_owned(),
        },
    );

    if room.session.is_none() && mutually_paired(&room) {
        promote(&mut room);
    }
}

/// Deprecated promotion path: records readiness only. Mutual selection is
/// the supported flow, so readiness never starts a session.
pub async fn set_ready(state: &AppState, game: &str, player: &str) {
    let Some(shared) = room(state, game).await else {
        return;
    };
    let mut room = shared.lock().await;
    if let Some(handle) = room.player_mut(player) {
        handle.ready = true;
        info!(game, player, "player ready");
    }
}

/// Externally triggered start. Validates the same pairing-completion
/// condition as the selection path; anything else is ignored.
pub async fn start_game(state: &AppState, game: &str) {
    let Some(shared) = room(state, game).await else {
        debug!(game, "start for unknown room ignored");
        return;
    };
    let mut room = shared.lock().await;
    if room.session.is_some() {
        debug!(game, "start ignored: session already active");
        return;
    }
    if !mutually_paired(&room) {
        debug!(game, "start ignored: pairing incomplete");
        return;
    }
    promote(&mut room);
}

/// Pairing is complete when the roster holds exactly two players and every
/// player's selection names another member who selected them back.
fn mutually_paired(room: &Room) -> bool {
    room.roster.len() == 2
        && room.roster.iter().all(|p| {
            p.selected_opponent.as_deref().is_some_and(|opponent| {
                opponent != p.name
                    && room
                        .player(opponent)
                        .is_some_and(|other| other.selected_opponent.as_deref() == Some(&p.name))
            })
        })
}

/// Promote a paired room: coin-flip the first mover, create the session,
/// and broadcast the opening snapshot.
fn promote(room: &mut Room) {
    let first = usize::from(rand::rng().random_bool(0.5));
    let first_name = room.roster[first].name.clone();
    let second_name = room.roster[1 - first].name.clone();

    let session = GameSession::new(room.board, first_name.clone(), second_name);
    let snapshot = session.snapshot();
    room.session = Some(session);
    room.pairing_complete = true;

    info!(game = %room.id, first = %first_name, "session started");
    broadcast(room, &ServerMessage::GameStarted { game: room.id.clone(), state: snapshot });
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Fan a message out to every roster member. Closed or backed-up peers are
/// skipped silently; roster cleanup belongs to the disconnect path, and a
/// slow socket must not stall the room.
pub fn broadcast(room: &Room, message: &ServerMessage) {
    for player in &room.roster {
        let _ = player.tx.try_send(message.clone());
    }
}

#[cfg(test)]
#[path = "lobby_test.rs"]
mod tests;
