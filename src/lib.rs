//! Kraken REST Client
//!
//! An async client for the Kraken spot REST API that is safe to share between
//! concurrent tasks: every call is admitted against the account tier's
//! decaying cost budget before it is sent, and private calls are signed with
//! a fresh nonce.
//!
//! ```no_run
//! use kraken_rest::{ClientConfig, Credentials, KrakenClient, RateLimitTier};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default().with_tier(RateLimitTier::Tier2);
//!     let credentials = Credentials::new("api_key", "a2V5")?;
//!     let client = KrakenClient::with_credentials(config, credentials)?;
//!
//!     let balances = client.balance().await?;
//!     if !balances.errors.is_empty() {
//!         eprintln!("exchange errors: {:?}", balances.errors);
//!     }
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod error;
pub mod kraken;

pub use config::{ClientConfig, RateLimitTier, TierLimits};
pub use error::{KrakenError, Result};

// Re-export the client for convenience
pub use kraken::{Credentials, KrakenClient, QueryArgs, ResponseEnvelope};
