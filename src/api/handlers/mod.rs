pub mod auth;
pub mod health;
pub mod products;

// common gate for the protected handlers

use crate::session::{cookie, DbCredentials, SessionKey};
use axum::{
    http::{header::COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

/// Uniform 401. Missing cookie, tampered token, and expired session all land
/// here; the response never says which.
pub(crate) fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}

/// Generic 500. The cause goes to the logs, never to the client.
pub(crate) fn internal_error(err: &anyhow::Error) -> Response {
    error!("{err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
        .into_response()
}

/// Resolve the request's session cookie into a credential record, or reject
/// the request with [`unauthorized`].
pub(crate) fn require_session(
    headers: &HeaderMap,
    key: &SessionKey,
) -> Result<DbCredentials, Response> {
    let cookie_header = headers.get(COOKIE).and_then(|value| value.to_str().ok());

    cookie::extract(cookie_header, key).ok_or_else(unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::encode;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn test_key() -> SessionKey {
        SessionKey::from_bytes([7u8; 32])
    }

    #[test]
    fn test_require_session_without_cookie() {
        let headers = HeaderMap::new();
        assert!(require_session(&headers, &test_key()).is_err());
    }

    #[test]
    fn test_require_session_round_trip() {
        let credentials = DbCredentials {
            host: "db.example.com".to_string(),
            port: 5432,
            user: "alice".to_string(),
            password: "p@ss".to_string(),
            database: "inv".to_string(),
        };
        let token = encode(&test_key(), &credentials, Duration::from_secs(60)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("db_session={token}")).unwrap(),
        );

        assert_eq!(
            require_session(&headers, &test_key()).unwrap(),
            credentials
        );
    }

    #[test]
    fn test_require_session_non_utf8_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        assert!(require_session(&headers, &test_key()).is_err());
    }
}
