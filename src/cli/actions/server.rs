use crate::{api, cli::actions::Action, session::SessionKey};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            session_secret,
            session_ttl_seconds,
            cookie_secure,
        } => {
            // Key derivation is deliberately slow (scrypt), do it once here and
            // share the immutable key with every handler.
            let key = SessionKey::derive(&session_secret)
                .context("Failed to derive session key from secret")?;

            let config = api::Config::new(Duration::from_secs(session_ttl_seconds), cookie_secure);

            api::new(port, Arc::new(key), config).await?;
        }
    }

    Ok(())
}
