use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::DbCredentials;

/// Connection parameters submitted by the login form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl LoginRequest {
    /// Turn the request into a credential record, rejecting partial input
    /// before it gets anywhere near a token.
    pub(crate) fn into_credentials(self) -> Option<DbCredentials> {
        if self.host.is_empty()
            || self.port == 0
            || self.user.is_empty()
            || self.password.is_empty()
            || self.database.is_empty()
        {
            return None;
        }

        Some(DbCredentials {
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
        })
    }
}

/// What the session endpoint reveals about an active session. The password
/// never leaves the encrypted cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
}

impl From<&DbCredentials> for SessionResponse {
    fn from(credentials: &DbCredentials) -> Self {
        Self {
            host: credentials.host.clone(),
            port: credentials.port,
            user: credentials.user.clone(),
            database: credentials.database.clone(),
        }
    }
}
