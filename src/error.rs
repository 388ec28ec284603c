//! Client error types
//!
//! Protocol errors (the `error` array of a decoded envelope) are not
//! represented here; they travel inside [`ResponseEnvelope`] so callers can
//! branch on the exchange's error codes.
//!
//! [`ResponseEnvelope`]: crate::kraken::types::ResponseEnvelope

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KrakenError {
    /// Invalid credentials, secret encoding, base URL or other construction input
    #[error("configuration error: {0}")]
    Config(String),

    /// The server answered with a non-success HTTP status
    #[error("HTTP {status} from {path}: {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("network error calling {path}: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not a valid envelope
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Exchange-reported errors, produced only by `ResponseEnvelope::into_result`
    #[error("API error: {}", .0.join(", "))]
    Api(Vec<String>),

    /// The client was used after `close()`
    #[error("client has been closed")]
    Disposed,

    /// A required argument was empty
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
}

impl KrakenError {
    /// HTTP status code, if the error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error indicates a bug in the calling code rather than an
    /// environmental failure
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::Disposed | Self::MissingArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, KrakenError>;
