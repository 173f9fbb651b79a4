//! Auth routes — registration, login, and session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::services::{auth as auth_svc, session};
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";
const SESSION_COOKIE_DAYS: i64 = 7;

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn cookie_secure() -> bool {
    env_bool("COOKIE_SECURE").unwrap_or(false)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure())
        .max_age(Duration::days(SESSION_COOKIE_DAYS))
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct CredentialsBody {
    pub username: String,
    pub password: String,
}

/// `POST /api/auth/register` — create a user and open a session.
pub async fn register(State(state): State<AppState>, Json(body): Json<CredentialsBody>) -> Response {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "username and password are required");
    }

    let user = match auth_svc::register(&state.pool, body.username.trim(), &body.password).await {
        Ok(user) => user,
        Err(e) => return auth_error_response(&e),
    };

    match session::create_session(&state.pool, user.id).await {
        Ok(token) => {
            let jar = CookieJar::new().add(session_cookie(token));
            (StatusCode::CREATED, jar, Json(json!({ "user": user }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "session create failed after register");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to register user")
        }
    }
}

/// `POST /api/auth/login` — verify credentials and open a session.
pub async fn login(State(state): State<AppState>, Json(body): Json<CredentialsBody>) -> Response {
    let user = match auth_svc::login(&state.pool, body.username.trim(), &body.password).await {
        Ok(user) => user,
        Err(e) => return auth_error_response(&e),
    };

    match session::create_session(&state.pool, user.id).await {
        Ok(token) => {
            let jar = CookieJar::new().add(session_cookie(token));
            (StatusCode::OK, jar, Json(json!({ "user": user }))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "session create failed after login");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to log in")
        }
    }
}

/// `GET /api/auth/me` — current session user.
pub async fn me(auth: AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "user": auth.user }))
}

/// `POST /api/auth/logout` — delete the session and clear the cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::error!(error = %e, "session delete failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to log out");
    }

    let removal = Cookie::build((COOKIE_NAME, "")).path("/").build();
    let jar = CookieJar::new().remove(removal);
    (StatusCode::OK, jar, Json(json!({ "ok": true }))).into_response()
}

fn auth_error_response(error: &auth_svc::AuthError) -> Response {
    use auth_svc::AuthError;
    let status = match error {
        AuthError::UserExists => StatusCode::CONFLICT,
        AuthError::UnknownUser => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Database(e) => {
            tracing::error!(error = %e, "auth database failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, &error.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
