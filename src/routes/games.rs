//! Game catalog routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::catalog::{self, CatalogError, GameRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateGameBody {
    pub name: String,
    pub genre: String,
    pub release_date: Option<Date>,
    #[serde(default)]
    pub is_released: bool,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateGameBody {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<Date>,
    pub is_released: Option<bool>,
    pub image_url: Option<String>,
}

/// `POST /api/games` — add a catalog game. Name and genre are required.
pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<CreateGameBody>,
) -> Result<(StatusCode, Json<GameRow>), StatusCode> {
    if body.name.trim().is_empty() || body.genre.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = catalog::create_game(
        &state.pool,
        body.name.trim(),
        body.genre.trim(),
        body.release_date,
        body.is_released,
        body.image_url.as_deref(),
    )
    .await
    .map_err(catalog_error_to_status)?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/games` — list the catalog.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<GameRow>>, StatusCode> {
    let rows = catalog::list_games(&state.pool)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/games/{id}` — fetch one game.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameRow>, StatusCode> {
    let row = catalog::get_game(&state.pool, id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(Json(row))
}

/// `PATCH /api/games/{id}` — partial update.
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGameBody>,
) -> Result<Json<GameRow>, StatusCode> {
    let row = catalog::update_game(
        &state.pool,
        id,
        body.name.as_deref(),
        body.genre.as_deref(),
        body.release_date,
        body.is_released,
        body.image_url.as_deref(),
    )
    .await
    .map_err(catalog_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/games/{id}`.
pub async fn delete(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    catalog::delete_game(&state.pool, id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn catalog_error_to_status(error: CatalogError) -> StatusCode {
    match error {
        CatalogError::GameNotFound(_) | CatalogError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Database(e) => {
            tracing::error!(error = %e, "catalog database failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
