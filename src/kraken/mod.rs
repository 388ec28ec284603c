//! Kraken Exchange REST API Library
//!
//! # Features
//!
//! - **Public and private endpoints** through one client
//! - **Cost-based rate limiting** per account tier, shared across tasks
//! - **Request signing** with HMAC-SHA512 over path and nonce-prefixed body
//! - **Pluggable nonce source and transport**
//!
//! # Quick Start
//!
//! ```no_run
//! use kraken_rest::kraken::{KrakenClient, QueryArgs};
//! use kraken_rest::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = KrakenClient::new(ClientConfig::default())?;
//!
//!     let ticker = client.ticker("XBTUSD").await?.into_result()?;
//!     for (pair, info) in ticker {
//!         println!("{}: {:?}", pair, info.last_price());
//!     }
//!
//!     // Endpoints without a helper go through the generic entry points
//!     let spread: serde_json::Value = client
//!         .query_public("Spread", QueryArgs::new().arg("pair", "XBTUSD"))
//!         .await?
//!         .into_result()?;
//!     println!("{}", spread);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`auth`]: Credentials and request signing
//! - [`nonce`]: Nonce sources
//! - [`form`]: Form body encoding
//! - [`transport`]: HTTP transport abstraction
//! - [`types`]: Response envelope and payload types
//! - [`client`]: Main API client implementation

pub mod auth;
pub mod client;
pub mod form;
pub mod nonce;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use auth::{sign_request, Credentials};
pub use client::{KrakenClient, KrakenClientBuilder, DEFAULT_COST, HISTORY_COST};
pub use form::QueryArgs;
pub use nonce::{ClockNonce, NonceSource};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::ResponseEnvelope;
