//! # Almacen
//!
//! `almacen` is a small inventory-management service that works directly
//! against a `PostgreSQL` database owned by the operator. There is no user
//! table: logging in means proving you hold working database credentials.
//!
//! ## Sessions
//!
//! The credentials submitted at login are authenticated-encrypted
//! (AES-256-GCM) into an opaque `db_session` cookie under a key derived from
//! an operator-supplied secret. The server stores nothing; the cookie is the
//! only persisted copy of the credentials. Every request decrypts the cookie,
//! rebuilds a short-lived connection pool, and releases it when the handler
//! finishes.
//!
//! Tampered, truncated, expired, or otherwise invalid cookies are
//! indistinguishable from missing ones: all of them produce a generic
//! `401 Unauthorized`.
//!
//! ## Products
//!
//! CRUD endpoints over a single `products` table, including image upload as
//! binary blobs (rendered back as base64 data URLs).

pub mod api;
pub mod cli;
pub mod db;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
