//! Authentication utilities for the Kraken REST API
//!
//! Private calls carry two headers: `API-Key` with the key verbatim and
//! `API-Sign` with
//! `base64(HMAC-SHA512(secret, path ++ SHA256(nonce ++ encoded_body)))`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

use crate::error::{KrakenError, Result};

type HmacSha512 = Hmac<Sha512>;

pub const API_KEY_HEADER: &str = "API-Key";
pub const API_SIGN_HEADER: &str = "API-Sign";

/// Compute the `API-Sign` value for one private call
///
/// `encoded_body` must be the exact bytes that go on the wire, nonce field
/// included.
///
/// # Example
///
/// ```
/// use kraken_rest::kraken::auth::sign_request;
///
/// let signature = sign_request(
///     "/0/private/Balance",
///     "nonce=1616492376594",
///     "1616492376594",
///     b"secret",
/// );
/// assert!(!signature.is_empty());
/// ```
pub fn sign_request(path: &str, encoded_body: &str, nonce: &str, secret: &[u8]) -> String {
    let mac = HmacSha512::new_from_slice(secret).expect("HMAC can take key of any size");
    sign_with(mac, path, encoded_body, nonce)
}

fn sign_with(mut mac: HmacSha512, path: &str, encoded_body: &str, nonce: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(nonce.as_bytes());
    sha.update(encoded_body.as_bytes());

    mac.update(path.as_bytes());
    mac.update(&sha.finalize());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// API credentials with the secret decoded and keyed once
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    mac: HmacSha512,
}

impl Credentials {
    /// Create credentials from the API key and the base64 private key
    pub fn new(api_key: impl Into<String>, private_key: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(KrakenError::Config("API key is empty".to_string()));
        }

        let secret = STANDARD
            .decode(private_key.trim())
            .map_err(|e| KrakenError::Config(format!("private key is not valid base64: {e}")))?;
        if secret.is_empty() {
            return Err(KrakenError::Config("private key is empty".to_string()));
        }

        let mac = HmacSha512::new_from_slice(&secret)
            .map_err(|e| KrakenError::Config(format!("unusable private key: {e}")))?;

        Ok(Self { api_key, mac })
    }

    /// Create credentials from environment variables
    ///
    /// Looks for `KRAKEN_API_KEY` and `KRAKEN_API_SECRET`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("KRAKEN_API_KEY")
            .map_err(|_| KrakenError::Config("KRAKEN_API_KEY is not set".to_string()))?;
        let api_secret = std::env::var("KRAKEN_API_SECRET")
            .map_err(|_| KrakenError::Config("KRAKEN_API_SECRET is not set".to_string()))?;
        Self::new(api_key, &api_secret)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Sign a request body
    pub fn sign(&self, path: &str, encoded_body: &str, nonce: &str) -> String {
        sign_with(self.mac.clone(), path, encoded_body, nonce)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
