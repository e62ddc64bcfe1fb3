use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        session_secret: matches
            .get_one::<String>("session-secret")
            .map(|s| SecretString::from(s.clone()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --session-secret"))?,
        session_ttl_seconds: matches
            .get_one::<u64>("session-ttl-seconds")
            .copied()
            .unwrap_or(43200),
        cookie_secure: matches.get_flag("cookie-secure"),
    })
}
