//! Chat transcript persistence boundary.
//!
//! The core only ever appends; nothing in this process reads a transcript
//! back. The trait keeps the relay testable without a database.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::message::ChatMessage;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Append-only sink for chat lines.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persist one chat line for `game`.
    async fn append(&self, game: &str, message: &ChatMessage) -> Result<(), TranscriptError>;
}

/// Postgres-backed store. Client-minted ids are kept as-is; a replayed id
/// is ignored rather than erroring.
pub struct PgTranscriptStore {
    pool: PgPool,
}

impl PgTranscriptStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranscriptStore for PgTranscriptStore {
    async fn append(&self, game: &str, message: &ChatMessage) -> Result<(), TranscriptError> {
        sqlx::query(
            "INSERT INTO chat_messages (id, game, player, text, sent_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&message.id)
        .bind(game)
        .bind(&message.player)
        .bind(&message.text)
        .bind(&message.time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
