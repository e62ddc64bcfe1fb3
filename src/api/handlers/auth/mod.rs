//! Login, session introspection, and logout.
//!
//! Login is the only place credentials arrive in plaintext: they are probed
//! against the database and, only on success, sealed into the `db_session`
//! cookie. Logout just deletes the cookie; there is no server-side session
//! state to destroy.

mod types;

pub(crate) use types::{LoginRequest, SessionResponse};

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::require_session;
use crate::{
    api::Config,
    db,
    session::{self, cookie, SessionKey},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials verified, session cookie set"),
        (status = 400, description = "Incomplete credentials"),
        (status = 401, description = "Database rejected the credentials")
    ),
    tag = "auth",
)]
/// Verify the submitted credentials and issue a session cookie.
pub async fn login(
    key: Extension<Arc<SessionKey>>,
    config: Extension<Arc<Config>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let Some(credentials) = request.into_credentials() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "all connection fields are required"})),
        )
            .into_response();
    };

    // A record that fails the probe is never sealed into a cookie.
    if !db::test_connection(&credentials).await {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "could not connect with the provided credentials"})),
        )
            .into_response();
    }

    let token = match session::encode(&key, &credentials, config.session_ttl()) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to encode session token: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Ok(cookie_value) = cookie::session_cookie(&token, config.cookie_secure()) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    info!(
        host = %credentials.host,
        database = %credentials.database,
        "Session issued"
    );

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie_value);

    (StatusCode::OK, headers, Json(json!({"success": true}))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth",
)]
/// Report the connection the current session points at, password excluded.
pub async fn session(headers: HeaderMap, key: Extension<Arc<SessionKey>>) -> Response {
    // Missing and invalid cookies are both "no session": nothing to learn here.
    match require_session(&headers, &key) {
        Ok(credentials) => (
            StatusCode::OK,
            Json(SessionResponse::from(&credentials)),
        )
            .into_response(),
        Err(_) => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth",
)]
/// Delete the session cookie. The encrypted cookie is the only copy of the
/// session, so this is all a logout takes.
pub async fn logout(config: Extension<Arc<Config>>) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(cookie_value) = cookie::clear_session_cookie(config.cookie_secure()) {
        headers.insert(SET_COOKIE, cookie_value);
    }

    (StatusCode::NO_CONTENT, headers).into_response()
}
