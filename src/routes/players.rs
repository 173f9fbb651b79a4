//! Player record routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::games::catalog_error_to_status;
use crate::services::catalog::{self, PlayerRow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePlayerBody {
    pub name: String,
    pub game_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdatePlayerBody {
    pub name: Option<String>,
    pub game_id: Option<Uuid>,
}

/// `POST /api/players` — create a player record. Name is required.
pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<CreatePlayerBody>,
) -> Result<(StatusCode, Json<PlayerRow>), StatusCode> {
    if body.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = catalog::create_player(&state.pool, body.name.trim(), body.game_id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/players` — list player records.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PlayerRow>>, StatusCode> {
    let rows = catalog::list_players(&state.pool)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(Json(rows))
}

/// `GET /api/players/{id}` — fetch one player record.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerRow>, StatusCode> {
    let row = catalog::get_player(&state.pool, id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(Json(row))
}

/// `PATCH /api/players/{id}` — partial update.
pub async fn update(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePlayerBody>,
) -> Result<Json<PlayerRow>, StatusCode> {
    let row = catalog::update_player(&state.pool, id, body.name.as_deref(), body.game_id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(Json(row))
}

/// `DELETE /api/players/{id}`.
pub async fn delete(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    catalog::delete_player(&state.pool, id)
        .await
        .map_err(catalog_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}
