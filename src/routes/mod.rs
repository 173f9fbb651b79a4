//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the HTTP catalog/auth surface and the websocket
//! endpoint under a single Axum router, with CORS and request tracing
//! applied to everything.

pub mod auth;
pub mod games;
pub mod players;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/games", get(games::list).post(games::create))
        .route(
            "/api/games/{id}",
            get(games::get_by_id).patch(games::update).delete(games::delete),
        )
        .route("/api/players", get(players::list).post(players::create))
        .route(
            "/api/players/{id}",
            get(players::get_by_id).patch(players::update).delete(players::delete),
        )
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
