//! Wire messages — the closed protocol spoken over the websocket.
//!
//! DESIGN
//! ======
//! Every inbound frame is a `ClientMessage` and every outbound frame is a
//! `ServerMessage`, both discriminated by a `"type"` field in
//! SCREAMING_SNAKE_CASE. The router matches exhaustively, so adding a kind
//! without handling it is a compile error. A frame whose `"type"` is absent
//! or unrecognized fails to parse and is dropped by the connection loop.
//!
//! Game state travels as a `GameSnapshot`: the full board plus turn and
//! outcome, in camelCase to match the client protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// INBOUND
// =============================================================================

/// Board shape requested when joining a room. The first joiner fixes it for
/// the room's lifetime; later values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardMode {
    /// 3x3 board, three in a row wins.
    Classic,
    /// 15x15 board, five in a row wins.
    FiveInARow,
}

/// A requested board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

/// A chat line. The client mints `id` and `time`; the server relays both
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub player: String,
    pub time: String,
}

/// Everything a client can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    JoinLobby {
        game: String,
        player: String,
        #[serde(default)]
        mode: Option<BoardMode>,
    },
    LeaveLobby {
        game: String,
    },
    SelectOpponent {
        game: String,
        player: String,
        opponent: String,
    },
    PlayerReady {
        game: String,
        player: String,
    },
    StartGame {
        game: String,
    },
    MakeMove {
        game: String,
        player: String,
        #[serde(rename = "move")]
        mv: Move,
    },
    SendMessage {
        game: String,
        message: ChatMessage,
    },
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Point-in-time view of a session, broadcast on start and after every
/// accepted move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    /// Row-major cells: `""`, `"X"`, or `"O"`.
    pub board: Vec<String>,
    pub dimension: usize,
    pub win_length: usize,
    pub current_player: String,
    /// Player name to assigned mark.
    pub player_marks: HashMap<String, String>,
    pub winner: Option<String>,
    pub outcome: SnapshotOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotOutcome {
    InProgress,
    Won,
    Draw,
}

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Welcome frame carrying the per-connection session id.
    Connected { session: Uuid },
    LobbyUpdate { game: String, players: Vec<String> },
    OpponentSelected { game: String, player: String, opponent: String },
    GameStarted { game: String, state: GameSnapshot },
    GameUpdate { game: String, state: GameSnapshot },
    NewMessage { message: ChatMessage },
    /// Sent to the offending requester only, never broadcast.
    Error { message: String },
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
