//! Credential-bearing encrypted sessions.
//!
//! The session token is the only place the database credentials live once the
//! login response has been sent: `encode` seals them with AES-256-GCM under a
//! key derived from the operator secret, `decode` opens and validates them on
//! every request. The wire format is `<ivHex>.<ciphertextHex>.<tagHex>`.
//!
//! Both functions are pure apart from the randomness source; the key holder
//! is built once at startup and shared read-only.

pub mod cookie;

use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes256,
    AesGcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use scrypt::Params;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

// AES-256-GCM with a 16-byte nonce, matching the token format where the IV is
// a full cipher block. The tag is transported as the third token part.
type Cipher = AesGcm<Aes256, U16>;

const IV_LENGTH: usize = 16;
const TAG_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

// Fixed KDF salt: tokens must survive process restarts, so the derivation is
// deterministic for a given secret.
const KEY_SALT: &[u8] = b"salt";

// scrypt N=2^14, r=8, p=1
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Minimum length for the operator secret the key is derived from.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed token")]
    TokenFormat,
    #[error("invalid hex encoding")]
    Hex,
    #[error("authentication failure")]
    Authentication,
    #[error("malformed payload")]
    Payload,
    #[error("token expired")]
    Expired,
    #[error("encryption failure")]
    Encrypt,
}

/// Database connection parameters carried by a session.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbCredentials {
    /// A record is only usable when every field is populated; partial records
    /// are never sealed into a token or returned from one.
    fn validate(&self) -> Result<(), SessionError> {
        if self.host.is_empty()
            || self.port == 0
            || self.user.is_empty()
            || self.password.is_empty()
            || self.database.is_empty()
        {
            return Err(SessionError::Payload);
        }

        Ok(())
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

/// What actually gets encrypted: the credentials plus an expiry so a captured
/// token does not stay valid until the secret changes.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    credentials: DbCredentials,
    exp: i64,
}

/// Immutable 256-bit session key, derived once at startup and injected into
/// the codec by reference.
#[derive(Clone)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl SessionKey {
    /// Derive the key from the operator secret via scrypt.
    ///
    /// # Errors
    /// Returns an error if the secret is shorter than [`MIN_SECRET_LENGTH`]
    /// or if the KDF rejects its parameters.
    pub fn derive(secret: &SecretString) -> anyhow::Result<Self> {
        let secret = secret.expose_secret();
        if secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("session secret must be at least {MIN_SECRET_LENGTH} characters");
        }

        let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LENGTH)?;

        let mut key = [0u8; KEY_LENGTH];
        scrypt::scrypt(secret.as_bytes(), KEY_SALT, &params, &mut key)?;

        Ok(Self(key))
    }

    /// Build a key from raw bytes, bypassing derivation. Intended for tests
    /// that need distinct keys without paying the scrypt cost.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> Cipher {
        Cipher::new(Key::<Cipher>::from_slice(&self.0))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Seal a credential record into an opaque session token.
///
/// Every call draws a fresh random IV, so re-encoding the same record yields
/// a different token each time.
///
/// # Errors
/// Returns `Payload` for a partial record, `Encrypt` if the cipher fails.
pub fn encode(
    key: &SessionKey,
    credentials: &DbCredentials,
    ttl: Duration,
) -> Result<String, SessionError> {
    credentials.validate()?;

    let mut iv = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut iv);

    let exp = unix_now().saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    let claims = Claims {
        credentials: credentials.clone(),
        exp,
    };
    let plaintext = serde_json::to_vec(&claims).map_err(|_| SessionError::Payload)?;

    let sealed = key
        .cipher()
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_ref())
        .map_err(|_| SessionError::Encrypt)?;

    // The AEAD appends the tag to the ciphertext; the token carries it as a
    // separate part.
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);

    Ok(format!(
        "{}.{}.{}",
        hex::encode(iv),
        hex::encode(ciphertext),
        hex::encode(tag)
    ))
}

/// Open a session token and return the credential record it carries.
///
/// Total over arbitrary input: any tampering, truncation, or corruption maps
/// to an error, never a panic and never a partial record.
///
/// # Errors
/// `TokenFormat` for wrong part count or lengths, `Hex` for non-hex parts,
/// `Authentication` when the tag does not verify, `Payload` when the
/// plaintext is not a valid record, `Expired` when the token is past its
/// embedded expiry.
pub fn decode(key: &SessionKey, token: &str) -> Result<DbCredentials, SessionError> {
    decode_at(key, token, unix_now())
}

fn decode_at(key: &SessionKey, token: &str, now: i64) -> Result<DbCredentials, SessionError> {
    let parts: Vec<&str> = token.split('.').collect();
    let (iv_hex, ciphertext_hex, tag_hex) = match parts.as_slice() {
        [iv, ciphertext, tag] => (*iv, *ciphertext, *tag),
        _ => return Err(SessionError::TokenFormat),
    };

    if iv_hex.is_empty() || ciphertext_hex.is_empty() || tag_hex.is_empty() {
        return Err(SessionError::TokenFormat);
    }

    let iv = hex::decode(iv_hex).map_err(|_| SessionError::Hex)?;
    let ciphertext = hex::decode(ciphertext_hex).map_err(|_| SessionError::Hex)?;
    let tag = hex::decode(tag_hex).map_err(|_| SessionError::Hex)?;

    if iv.len() != IV_LENGTH || tag.len() != TAG_LENGTH {
        return Err(SessionError::TokenFormat);
    }

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    // Tag verification happens inside decrypt: on any altered bit the
    // plaintext is never released.
    let plaintext = key
        .cipher()
        .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_ref())
        .map_err(|_| SessionError::Authentication)?;

    let claims: Claims = serde_json::from_slice(&plaintext).map_err(|_| SessionError::Payload)?;
    claims.credentials.validate()?;

    if claims.exp <= now {
        return Err(SessionError::Expired);
    }

    Ok(claims.credentials)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    const TTL: Duration = Duration::from_secs(3600);

    fn test_key() -> SessionKey {
        SessionKey::from_bytes([7u8; KEY_LENGTH])
    }

    fn credentials() -> DbCredentials {
        DbCredentials {
            host: "db.example.com".to_string(),
            port: 5432,
            user: "alice".to_string(),
            password: "p@ss".to_string(),
            database: "inv".to_string(),
        }
    }

    // Flip one hex character, keeping the string valid hex.
    fn flip_hex_char(token: &str, index: usize) -> String {
        let mut chars: Vec<char> = token.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_round_trip() {
        let key = test_key();
        let token = encode(&key, &credentials(), TTL).unwrap();
        assert_eq!(decode(&key, &token).unwrap(), credentials());
    }

    #[test]
    fn test_encode_is_not_deterministic() {
        let key = test_key();
        let first = encode(&key, &credentials(), TTL).unwrap();
        let second = encode(&key, &credentials(), TTL).unwrap();

        // Fresh IV per call: same record, different tokens
        assert_ne!(first, second);
        assert_eq!(decode(&key, &first).unwrap(), credentials());
        assert_eq!(decode(&key, &second).unwrap(), credentials());
    }

    #[test]
    fn test_token_format() {
        let key = test_key();
        let token = encode(&key, &credentials(), TTL).unwrap();

        let re = Regex::new(r"^[0-9a-f]+\.[0-9a-f]+\.[0-9a-f]+$").unwrap();
        assert!(re.is_match(&token));

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), IV_LENGTH * 2);
        assert_eq!(parts[2].len(), TAG_LENGTH * 2);
    }

    #[test]
    fn test_tamper_sensitivity() {
        let key = test_key();

        for _ in 0..16 {
            let token = encode(&key, &credentials(), TTL).unwrap();
            let parts: Vec<&str> = token.split('.').collect();
            let iv_end = parts[0].len();
            let ciphertext_end = iv_end + 1 + parts[1].len();

            // One flip in each part: IV, ciphertext, tag
            for index in [
                0,
                iv_end - 1,
                iv_end + 1,
                ciphertext_end - 1,
                ciphertext_end + 1,
                token.len() - 1,
            ] {
                let tampered = flip_hex_char(&token, index);
                assert!(
                    decode(&key, &tampered).is_err(),
                    "flip at {index} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_malformed_tokens() {
        let key = test_key();

        for (token, expected) in [
            ("", SessionError::TokenFormat),
            ("not-a-token", SessionError::TokenFormat),
            ("a.b", SessionError::TokenFormat),
            ("a.b.c.d", SessionError::TokenFormat),
            ("..", SessionError::TokenFormat),
            ("aa..bb", SessionError::TokenFormat),
            ("zz.ff.ee", SessionError::Hex),
            ("0g.ff.ee", SessionError::Hex),
        ] {
            assert_eq!(decode(&key, token).unwrap_err(), expected, "{token:?}");
        }

        // Valid hex, wrong IV/tag lengths
        assert_eq!(
            decode(&key, "ab.cd.ef").unwrap_err(),
            SessionError::TokenFormat
        );
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let token = encode(&test_key(), &credentials(), TTL).unwrap();
        let other = SessionKey::from_bytes([8u8; KEY_LENGTH]);

        assert_eq!(
            decode(&other, &token).unwrap_err(),
            SessionError::Authentication
        );
    }

    #[test]
    fn test_partial_record_is_never_encoded() {
        let key = test_key();

        let mut no_host = credentials();
        no_host.host = String::new();
        assert_eq!(
            encode(&key, &no_host, TTL).unwrap_err(),
            SessionError::Payload
        );

        let mut port_zero = credentials();
        port_zero.port = 0;
        assert_eq!(
            encode(&key, &port_zero, TTL).unwrap_err(),
            SessionError::Payload
        );
    }

    // Seal arbitrary plaintext with the session cipher to exercise the
    // post-decryption payload checks.
    fn seal_raw(key: &SessionKey, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);
        let sealed = key
            .cipher()
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
            .unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);
        format!(
            "{}.{}.{}",
            hex::encode(iv),
            hex::encode(ciphertext),
            hex::encode(tag)
        )
    }

    #[test]
    fn test_valid_tag_with_malformed_payload() {
        let key = test_key();

        // Not JSON at all
        let token = seal_raw(&key, b"not json");
        assert_eq!(decode(&key, &token).unwrap_err(), SessionError::Payload);

        // JSON but missing required fields
        let token = seal_raw(&key, br#"{"host":"db.example.com"}"#);
        assert_eq!(decode(&key, &token).unwrap_err(), SessionError::Payload);

        // Structurally complete but empty field
        let token = seal_raw(
            &key,
            br#"{"host":"","port":5432,"user":"u","password":"p","database":"d","exp":9999999999}"#,
        );
        assert_eq!(decode(&key, &token).unwrap_err(), SessionError::Payload);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let key = test_key();
        let token = encode(&key, &credentials(), TTL).unwrap();

        let now = unix_now();
        assert_eq!(decode_at(&key, &token, now).unwrap(), credentials());
        assert_eq!(
            decode_at(&key, &token, now + TTL.as_secs() as i64 + 1).unwrap_err(),
            SessionError::Expired
        );
    }

    #[test]
    fn test_key_derivation_is_deterministic() {
        let secret = SecretString::from("a-very-long-random-secret-value-1234".to_string());

        let first = SessionKey::derive(&secret).unwrap();
        let second = SessionKey::derive(&secret).unwrap();
        assert_eq!(first.0, second.0);

        // Tokens issued by a previous process must still decode
        let token = encode(&first, &credentials(), TTL).unwrap();
        assert_eq!(decode(&second, &token).unwrap(), credentials());

        let other = SessionKey::derive(&SecretString::from(
            "another-long-random-secret-value-5678".to_string(),
        ))
        .unwrap();
        assert_ne!(first.0, other.0);
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let secret = SecretString::from("too-short".to_string());
        assert!(SessionKey::derive(&secret).is_err());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let secret = SecretString::from("a-very-long-random-secret-value-1234".to_string());
        let key = SessionKey::derive(&secret).unwrap();

        let token = encode(&key, &credentials(), TTL).unwrap();
        let re = Regex::new(r"^[0-9a-f]+\.[0-9a-f]+\.[0-9a-f]+$").unwrap();
        assert!(re.is_match(&token));

        assert_eq!(decode(&key, &token).unwrap(), credentials());

        let tampered = flip_hex_char(&token, token.len() - 1);
        assert!(decode(&key, &tampered).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("p@ss"));
        assert!(debug.contains("[REDACTED]"));

        assert_eq!(format!("{:?}", test_key()), "SessionKey([REDACTED])");
    }
}
