//! Bridge between the raw `Cookie` header and the session codec.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use tracing::debug;

use super::{decode, DbCredentials, SessionKey};

pub const SESSION_COOKIE_NAME: &str = "db_session";

/// Pull the session cookie out of a raw `Cookie` header and decode it.
///
/// Absent header, absent cookie, and invalid token all collapse to `None`;
/// callers cannot distinguish why authentication failed, and must not.
#[must_use]
pub fn extract(cookie_header: Option<&str>, key: &SessionKey) -> Option<DbCredentials> {
    let value = find_cookie(cookie_header?)?;

    match decode(key, value) {
        Ok(credentials) => Some(credentials),
        Err(err) => {
            // The typed reason stays in the logs; the caller only sees "no session".
            debug!("Rejected session cookie: {err}");
            None
        }
    }
}

fn find_cookie(header: &str) -> Option<&str> {
    for pair in header.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let Some(name) = parts.next() else { continue };
        let Some(value) = parts.next() else { continue };
        if name.trim() == SESSION_COOKIE_NAME {
            return Some(value.trim());
        }
    }

    None
}

/// Build the `HttpOnly` session cookie carrying a freshly issued token.
///
/// No `Max-Age`: the cookie lives for the browser session, the real lifetime
/// is the expiry sealed inside the token.
///
/// # Errors
/// Returns an error if the token contains characters invalid in a header.
pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
}

/// Build the cookie that deletes the session on logout.
///
/// # Errors
/// Returns an error if the header value cannot be constructed.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
}
