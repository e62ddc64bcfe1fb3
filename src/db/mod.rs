//! Per-request database access built from decoded session credentials.
//!
//! There is no process-wide pool: every authenticated request rebuilds a
//! short-lived pool from the credentials carried by its session cookie and
//! drops it when the handler finishes.

use crate::session::DbCredentials;
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use tracing::Instrument;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONNECTIONS: u32 = 10;

fn connect_options(credentials: &DbCredentials) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&credentials.host)
        .port(credentials.port)
        .username(&credentials.user)
        .password(&credentials.password)
        .database(&credentials.database)
}

/// Open a pool scoped to a single request.
///
/// # Errors
/// Returns an error if the server is unreachable or rejects the credentials.
pub async fn pool(credentials: &DbCredentials) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .idle_timeout(IDLE_TIMEOUT)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(credentials))
        .await
        .context("Failed to connect to database")
}

/// Probe the credentials with a single connection and a `SELECT 1`.
///
/// Used by login before any token is issued; a record that fails the probe is
/// never sealed into a cookie.
pub async fn test_connection(credentials: &DbCredentials) -> bool {
    let connected = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options(credentials))
        .await;

    let Ok(pool) = connected else {
        return false;
    };

    let ok = sqlx::query("SELECT 1").execute(&pool).await.is_ok();
    pool.close().await;

    ok
}

/// Create the `products` table when it does not exist yet.
///
/// # Errors
/// Returns an error if the DDL fails.
pub async fn ensure_products_table(pool: &PgPool) -> Result<()> {
    let query = r"
        CREATE TABLE IF NOT EXISTS products (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            price DECIMAL(10, 2) NOT NULL DEFAULT 0,
            stock INTEGER NOT NULL DEFAULT 0,
            status VARCHAR(20) NOT NULL DEFAULT 'activo',
            image BYTEA,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "CREATE TABLE"
    );
    sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to create products table")?;

    Ok(())
}

/// Add the `status` column to tables created before it existed.
///
/// Returns `true` when the column was added, `false` when it was already
/// there.
///
/// # Errors
/// Returns an error if the probe or the `ALTER TABLE` fails.
pub async fn migrate_status_column(pool: &PgPool) -> Result<bool> {
    let query = r"
        SELECT column_name
        FROM information_schema.columns
        WHERE table_name = 'products' AND column_name = 'status'
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let existing = sqlx::query(query)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to probe for status column")?;

    if existing.is_some() {
        return Ok(false);
    }

    let alter = r"
        ALTER TABLE products
        ADD COLUMN status VARCHAR(20) NOT NULL DEFAULT 'activo'
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "ALTER TABLE"
    );
    sqlx::query(alter)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to add status column")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_from_credentials() {
        let credentials = DbCredentials {
            host: "db.example.com".to_string(),
            port: 5433,
            user: "alice".to_string(),
            password: "p@ss:with/odd?chars".to_string(),
            database: "inv".to_string(),
        };

        let options = connect_options(&credentials);
        assert_eq!(options.get_host(), "db.example.com");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "alice");
        assert_eq!(options.get_database(), Some("inv"));
    }
}
