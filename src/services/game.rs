//! Game session engine — the per-room board state machine.
//!
//! DESIGN
//! ======
//! `GameSession` is a plain struct with synchronous methods; all locking
//! lives in the room-level `apply_move` wrapper at the bottom. One
//! parametric run scanner serves both board shapes, so the 3x3 and 15x15
//! configurations cannot drift apart.
//!
//! ERROR HANDLING
//! ==============
//! An illegal move is a `MoveRejected`: the caller logs it at debug and
//! sends nothing. Rejections leave cells, turn, and outcome untouched.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::message::{BoardMode, GameSnapshot, ServerMessage, SnapshotOutcome};
use crate::services::lobby;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

/// A participant's board symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// Board shape, fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    pub dimension: usize,
    pub win_length: usize,
}

impl BoardConfig {
    /// 3x3, three in a row.
    pub const CLASSIC: Self = Self { dimension: 3, win_length: 3 };
    /// 15x15, five in a row.
    pub const FIVE_IN_A_ROW: Self = Self { dimension: 15, win_length: 5 };

    #[must_use]
    pub fn cell_count(self) -> usize {
        self.dimension * self.dimension
    }
}

impl From<BoardMode> for BoardConfig {
    fn from(mode: BoardMode) -> Self {
        match mode {
            BoardMode::Classic => Self::CLASSIC,
            BoardMode::FiveInARow => Self::FIVE_IN_A_ROW,
        }
    }
}

/// Session lifecycle. `Won` and `Draw` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Won(Mark),
    Draw,
}

impl Outcome {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

/// Why a move was not applied. Reported only to logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejected {
    #[error("session already finished")]
    Terminal,
    #[error("not {0}'s turn")]
    OutOfTurn(String),
    #[error("cell ({0}, {1}) is outside the board")]
    OutOfBounds(usize, usize),
    #[error("cell ({0}, {1}) is already occupied")]
    Occupied(usize, usize),
}

// =============================================================================
// SESSION
// =============================================================================

/// One in-progress or completed game bound to a paired room.
pub struct GameSession {
    config: BoardConfig,
    /// Row-major cells.
    cells: Vec<Option<Mark>>,
    /// `players[0]` holds X and moves first.
    players: [String; 2],
    /// Index into `players` of whoever moves next.
    turn: usize,
    outcome: Outcome,
}

impl GameSession {
    /// Start a session. `first` receives X and the opening move.
    #[must_use]
    pub fn new(config: BoardConfig, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            config,
            cells: vec![None; config.cell_count()],
            players: [first.into(), second.into()],
            turn: 0,
            outcome: Outcome::InProgress,
        }
    }

    #[must_use]
    pub fn config(&self) -> BoardConfig {
        self.config
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Name of the player whose move is next (or was last, once terminal).
    #[must_use]
    pub fn turn_of(&self) -> &str {
        &self.players[self.turn]
    }

    /// Whether `name` participates in this session.
    #[must_use]
    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p == name)
    }

    fn mark_of(&self, name: &str) -> Option<Mark> {
        match self.players.iter().position(|p| p == name) {
            Some(0) => Some(Mark::X),
            Some(_) => Some(Mark::O),
            None => None,
        }
    }

    fn cell(&self, row: usize, col: usize) -> Option<Mark> {
        self.cells[row * self.config.dimension + col]
    }

    /// Validate and apply one move, then advance the state machine: win
    /// scan, draw check, turn flip.
    pub fn apply_move(&mut self, player: &str, row: usize, col: usize) -> Result<(), MoveRejected> {
        if self.outcome.is_terminal() {
            return Err(MoveRejected::Terminal);
        }
        if player != self.turn_of() {
            return Err(MoveRejected::OutOfTurn(player.to_owned()));
        }
        let dim = self.config.dimension;
        if row >= dim || col >= dim {
            return Err(MoveRejected::OutOfBounds(row, col));
        }
        let idx = row * dim + col;
        if self.cells[idx].is_some() {
            return Err(MoveRejected::Occupied(row, col));
        }

        let mark = if self.turn == 0 { Mark::X } else { Mark::O };
        self.cells[idx] = Some(mark);

        if let Some(winner) = self.scan_winner() {
            self.outcome = Outcome::Won(winner);
        } else if self.cells.iter().all(Option::is_some) {
            self.outcome = Outcome::Draw;
        } else {
            self.turn = 1 - self.turn;
        }
        Ok(())
    }

    /// Scan the whole board for a run of `win_length` equal marks along any
    /// of the four axes.
    fn scan_winner(&self) -> Option<Mark> {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        let dim = isize::try_from(self.config.dimension).unwrap_or(0);
        let len = isize::try_from(self.config.win_length).unwrap_or(0);

        for row in 0..dim {
            for col in 0..dim {
                #[allow(clippy::cast_sign_loss)]
                let Some(mark) = self.cell(row as usize, col as usize) else {
                    continue;
                };
                for (dr, dc) in DIRECTIONS {
                    let end_row = row + (len - 1) * dr;
                    let end_col = col + (len - 1) * dc;
                    if end_row < 0 || end_row >= dim || end_col < 0 || end_col >= dim {
                        continue;
                    }
                    #[allow(clippy::cast_sign_loss)]
                    let run = (1..len).all(|step| {
                        self.cell((row + step * dr) as usize, (col + step * dc) as usize) == Some(mark)
                    });
                    if run {
                        return Some(mark);
                    }
                }
            }
        }
        None
    }

    /// Full public view of the session for broadcast.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let board = self
            .cells
            .iter()
            .map(|cell| cell.map_or_else(String::new, |m| m.as_str().to_owned()))
            .collect();

        let player_marks: HashMap<String, String> = self
            .players
            .iter()
            .map(|name| {
                let mark = self.mark_of(name).unwrap_or(Mark::X);
                (name.clone(), mark.as_str().to_owned())
            })
            .collect();

        let (winner, outcome) = match self.outcome {
            Outcome::InProgress => (None, SnapshotOutcome::InProgress),
            Outcome::Draw => (None, SnapshotOutcome::Draw),
            Outcome::Won(mark) => {
                let name = self
                    .players
                    .iter()
                    .find(|p| self.mark_of(p) == Some(mark))
                    .cloned();
                (name, SnapshotOutcome::Won)
            }
        };

        GameSnapshot {
            board,
            dimension: self.config.dimension,
            win_length: self.config.win_length,
            current_player: self.turn_of().to_owned(),
            player_marks,
            winner,
            outcome,
        }
    }
}

// =============================================================================
// ROOM-LEVEL TRANSITION
// =============================================================================

/// Apply a move for `player` in `game`'s session and broadcast the result.
///
/// Missing room, missing session, and illegal moves are all silent no-ops:
/// logged, no state change, no broadcast. A terminal outcome is broadcast
/// once, then the session is destroyed and the room returns to an unpaired,
/// joinable state with its roster intact.
pub async fn apply_move(state: &AppState, game: &str, player: &str, row: usize, col: usize) {
    let Some(shared) = lobby::room(state, game).await else {
        debug!(game, player, "move for unknown room ignored");
        return;
    };
    let mut room = shared.lock().await;

    let Some(session) = room.session.as_mut() else {
        debug!(game, player, "move without active session ignored");
        return;
    };

    match session.apply_move(player, row, col) {
        Ok(()) => {
            let snapshot = session.snapshot();
            let terminal = session.outcome().is_terminal();

            lobby::broadcast(
                &room,
                &ServerMessage::GameUpdate { game: game.to_owned(), state: snapshot },
            );

            if terminal {
                info!(game, "session finished; room open for a new pairing");
                room.reset_pairing();
            }
        }
        Err(reason) => {
            debug!(game, player, row, col, %reason, "move rejected");
        }
    }
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
