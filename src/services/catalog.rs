//! Catalog service — CRUD for game and player records.
//!
//! DESIGN
//! ======
//! Plain sqlx queries behind the REST routes. Rooms and sessions never
//! consult the catalog; it exists for the management surface only.

use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("game not found: {0}")]
    GameNotFound(Uuid),
    #[error("player not found: {0}")]
    PlayerNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row in the game catalog.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct GameRow {
    pub id: Uuid,
    pub name: String,
    pub genre: String,
    pub release_date: Option<Date>,
    pub is_released: bool,
    pub image_url: Option<String>,
}

/// Player record, optionally attached to a catalog game.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PlayerRow {
    pub id: Uuid,
    pub name: String,
    pub game_id: Option<Uuid>,
}

// =============================================================================
// GAMES
// =============================================================================

/// Create a catalog game.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_game(
    pool: &PgPool,
    name: &str,
    genre: &str,
    release_date: Option<Date>,
    is_released: bool,
    image_url: Option<&str>,
) -> Result<GameRow, CatalogError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO games (id, name, genre, release_date, is_released, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(name)
    .bind(genre)
    .bind(release_date)
    .bind(is_released)
    .bind(image_url)
    .execute(pool)
    .await?;

    Ok(GameRow {
        id,
        name: name.to_owned(),
        genre: genre.to_owned(),
        release_date,
        is_released,
        image_url: image_url.map(str::to_owned),
    })
}

/// List all catalog games, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_games(pool: &PgPool) -> Result<Vec<GameRow>, CatalogError> {
    let rows = sqlx::query_as::<_, GameRow>(
        "SELECT id, name, genre, release_date, is_released, image_url \
         FROM games ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch one game by id.
///
/// # Errors
///
/// `GameNotFound` if no row matches; otherwise database errors.
pub async fn get_game(pool: &PgPool, id: Uuid) -> Result<GameRow, CatalogError> {
    sqlx::query_as::<_, GameRow>(
        "SELECT id, name, genre, release_date, is_released, image_url FROM games WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(CatalogError::GameNotFound(id))
}

/// Patch a game. `None` fields are left unchanged.
///
/// # Errors
///
/// `GameNotFound` if no row matches; otherwise database errors.
pub async fn update_game(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    genre: Option<&str>,
    release_date: Option<Date>,
    is_released: Option<bool>,
    image_url: Option<&str>,
) -> Result<GameRow, CatalogError> {
    let row = sqlx::query_as::<_, GameRow>(
        "UPDATE games SET \
             name = COALESCE($2, name), \
             genre = COALESCE($3, genre), \
             release_date = COALESCE($4, release_date), \
             is_released = COALESCE($5, is_released), \
             image_url = COALESCE($6, image_url) \
         WHERE id = $1 \
         RETURNING id, name, genre, release_date, is_released, image_url",
    )
    .bind(id)
    .bind(name)
    .bind(genre)
    .bind(release_date)
    .bind(is_released)
    .bind(image_url)
    .fetch_optional(pool)
    .await?;

    row.ok_or(CatalogError::GameNotFound(id))
}

/// Delete a game by id.
///
/// # Errors
///
/// `GameNotFound` if no row matches; otherwise database errors.
pub async fn delete_game(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM games WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::GameNotFound(id));
    }
    Ok(())
}

// =============================================================================
// PLAYERS
// =============================================================================

/// Create a player record.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_player(pool: &PgPool, name: &str, game_id: Option<Uuid>) -> Result<PlayerRow, CatalogError> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO players (id, name, game_id) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(game_id)
        .execute(pool)
        .await?;
    Ok(PlayerRow { id, name: name.to_owned(), game_id })
}

/// List all player records.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_players(pool: &PgPool) -> Result<Vec<PlayerRow>, CatalogError> {
    let rows = sqlx::query_as::<_, PlayerRow>(
        "SELECT id, name, game_id FROM players ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch one player by id.
///
/// # Errors
///
/// `PlayerNotFound` if no row matches; otherwise database errors.
pub async fn get_player(pool: &PgPool, id: Uuid) -> Result<PlayerRow, CatalogError> {
    sqlx::query_as::<_, PlayerRow>("SELECT id, name, game_id FROM players WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CatalogError::PlayerNotFound(id))
}

/// Patch a player. `None` fields are left unchanged.
///
/// # Errors
///
/// `PlayerNotFound` if no row matches; otherwise database errors.
pub async fn update_player(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    game_id: Option<Uuid>,
) -> Result<PlayerRow, CatalogError> {
    let row = sqlx::query_as::<_, PlayerRow>(
        "UPDATE players SET \
             name = COALESCE($2, name), \
             game_id = COALESCE($3, game_id) \
         WHERE id = $1 \
         RETURNING id, name, game_id",
    )
    .bind(id)
    .bind(name)
    .bind(game_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(CatalogError::PlayerNotFound(id))
}

/// Delete a player by id.
///
/// # Errors
///
/// `PlayerNotFound` if no row matches; otherwise database errors.
pub async fn delete_player(pool: &PgPool, id: Uuid) -> Result<(), CatalogError> {
    let result = sqlx::query("DELETE FROM players WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::PlayerNotFound(id));
    }
    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
