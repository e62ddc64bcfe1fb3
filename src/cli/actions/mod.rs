pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        session_secret: SecretString,
        session_ttl_seconds: u64,
        cookie_secure: bool,
    },
}
