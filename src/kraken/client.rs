//! Kraken REST API Client
//!
//! Every call is one linear pipeline: admit against the rate limiter, sign
//! (private calls only), POST, decode the envelope. Nothing is retried; a
//! failed call returns its error and the caller decides what to do next.
//!
//! # Example
//!
//! ```no_run
//! use kraken_rest::{ClientConfig, Credentials, KrakenClient, RateLimitTier};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default().with_tier(RateLimitTier::Tier3);
//!     let client = KrakenClient::builder(config)
//!         .credentials(Credentials::from_env()?)
//!         .build()?;
//!
//!     let time = client.server_time().await?;
//!     println!("Server time: {:?}", time.result());
//!
//!     let balances = client.balance().await?.into_result()?;
//!     for (asset, amount) in balances {
//!         println!("{}: {}", asset, amount);
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::auth::{Credentials, API_KEY_HEADER, API_SIGN_HEADER};
use super::form::QueryArgs;
use super::nonce::{ClockNonce, NonceSource};
use super::transport::{HttpRequest, ReqwestTransport, Transport};
use super::types::*;
use crate::common::RateLimiter;
use crate::config::{ClientConfig, RateLimitTier};
use crate::error::{KrakenError, Result};

pub const API_VERSION: u32 = 0;

/// Cost of a call unless the endpoint declares otherwise
pub const DEFAULT_COST: u32 = 1;

/// Cost of history queries, which the exchange counts double
pub const HISTORY_COST: u32 = 2;

/// Resources released by [`KrakenClient::close`]
struct Session<T> {
    transport: T,
    credentials: Option<Credentials>,
}

/// Builder for [`KrakenClient`]
pub struct KrakenClientBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
    nonce_source: Option<Arc<dyn NonceSource>>,
}

impl KrakenClientBuilder {
    /// Credentials for private calls; without them only public calls work
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Replace the default wall-clock nonce source
    pub fn nonce_source(mut self, source: impl NonceSource + 'static) -> Self {
        self.nonce_source = Some(Arc::new(source));
        self
    }

    /// Build with the default reqwest transport
    pub fn build(self) -> Result<KrakenClient> {
        let transport = ReqwestTransport::new(&self.config)?;
        self.build_with_transport(transport)
    }

    /// Build with a caller-supplied transport
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<KrakenClient<T>> {
        let base_url = self.config.validated_base_url()?;

        // A tier turns on both limiters; "none" turns off both
        let limits = self.config.tier.limits();
        let public_limiter = RateLimiter::from_config(limits.map(|l| l.public));
        let private_limiter = RateLimiter::from_config(limits.map(|l| l.private));

        Ok(KrakenClient {
            base_url,
            tier: self.config.tier,
            public_limiter,
            private_limiter,
            nonce_source: self
                .nonce_source
                .unwrap_or_else(|| Arc::new(ClockNonce::new())),
            session: RwLock::new(Some(Arc::new(Session {
                transport,
                credentials: self.credentials,
            }))),
        })
    }
}

/// Kraken Exchange REST API Client
///
/// Safe to share between tasks (wrap in an `Arc`); all calls draw from the
/// same rate-limit budgets and nonce source.
pub struct KrakenClient<T: Transport = ReqwestTransport> {
    base_url: String,
    tier: RateLimitTier,
    public_limiter: RateLimiter,
    private_limiter: RateLimiter,
    nonce_source: Arc<dyn NonceSource>,
    session: RwLock<Option<Arc<Session<T>>>>,
}

impl KrakenClient {
    pub fn builder(config: ClientConfig) -> KrakenClientBuilder {
        KrakenClientBuilder {
            config,
            credentials: None,
            nonce_source: None,
        }
    }

    /// Create a client for public endpoints only
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Create a client able to call private endpoints
    pub fn with_credentials(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        Self::builder(config).credentials(credentials).build()
    }

    /// Create a client from `KRAKEN_*` environment variables
    ///
    /// Credentials are optional; when `KRAKEN_API_KEY` is unset the client is
    /// public-only.
    pub fn from_env() -> Result<Self> {
        let builder = Self::builder(ClientConfig::from_env());
        if std::env::var_os("KRAKEN_API_KEY").is_some() {
            builder.credentials(Credentials::from_env()?).build()
        } else {
            builder.build()
        }
    }
}

impl<T: Transport> KrakenClient<T> {
    /// Call a public endpoint with the default cost
    pub async fn query_public<R>(&self, method: &str, args: QueryArgs) -> Result<ResponseEnvelope<R>>
    where
        R: DeserializeOwned,
    {
        self.query_public_with_cost(method, args, DEFAULT_COST).await
    }

    /// Call a public endpoint, charging `cost` against the public budget
    pub async fn query_public_with_cost<R>(
        &self,
        method: &str,
        args: QueryArgs,
        cost: u32,
    ) -> Result<ResponseEnvelope<R>>
    where
        R: DeserializeOwned,
    {
        let path = Self::path("public", method)?;
        self.session().await?;

        self.public_limiter.admit(cost).await;

        let session = self.session().await?;
        debug!(path = %path, cost, "Dispatching public query");

        let request = HttpRequest {
            url: format!("{}{}", self.base_url, path),
            path,
            headers: Vec::new(),
            body: args.encode(),
        };
        Self::send(&session.transport, request).await
    }

    /// Call a private endpoint with the default cost
    pub async fn query_private<R>(&self, method: &str, args: QueryArgs) -> Result<ResponseEnvelope<R>>
    where
        R: DeserializeOwned,
    {
        self.query_private_with_cost(method, args, DEFAULT_COST).await
    }

    /// Call a private endpoint, charging `cost` against the private budget
    pub async fn query_private_with_cost<R>(
        &self,
        method: &str,
        args: QueryArgs,
        cost: u32,
    ) -> Result<ResponseEnvelope<R>>
    where
        R: DeserializeOwned,
    {
        let path = Self::path("private", method)?;
        Self::require_credentials(&*self.session().await?)?;

        self.private_limiter.admit(cost).await;

        let session = self.session().await?;
        let credentials = Self::require_credentials(&session)?;

        // Nonce is minted after admission; the signed body is the sent body.
        let nonce = self.nonce_source.next_nonce().to_string();
        let body = args.encode_with_nonce(&nonce);
        let signature = credentials.sign(&path, &body, &nonce);
        debug!(path = %path, cost, "Dispatching private query");

        let request = HttpRequest {
            url: format!("{}{}", self.base_url, path),
            path,
            headers: vec![
                (API_KEY_HEADER, credentials.api_key().to_string()),
                (API_SIGN_HEADER, signature),
            ],
            body,
        };
        Self::send(&session.transport, request).await
    }

    /// Release the transport and key material
    ///
    /// Calls already past admission finish normally; every later call fails
    /// with [`KrakenError::Disposed`]. Closing twice is a no-op.
    pub async fn close(&self) {
        if self.session.write().await.take().is_some() {
            debug!("Client closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.session.read().await.is_none()
    }

    pub fn tier(&self) -> RateLimitTier {
        self.tier
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn public_limiter(&self) -> &RateLimiter {
        &self.public_limiter
    }

    pub fn private_limiter(&self) -> &RateLimiter {
        &self.private_limiter
    }

    fn path(visibility: &str, method: &str) -> Result<String> {
        let method = method.trim_matches('/');
        if method.is_empty() {
            return Err(KrakenError::MissingArgument("method"));
        }
        Ok(format!("/{}/{}/{}", API_VERSION, visibility, method))
    }

    async fn session(&self) -> Result<Arc<Session<T>>> {
        self.session
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(KrakenError::Disposed)
    }

    fn require_credentials(session: &Session<T>) -> Result<&Credentials> {
        session
            .credentials
            .as_ref()
            .ok_or_else(|| KrakenError::Config("private query requires credentials".to_string()))
    }

    async fn send<R>(transport: &T, request: HttpRequest) -> Result<ResponseEnvelope<R>>
    where
        R: DeserializeOwned,
    {
        let path = request.path.clone();
        let response = transport.post(request).await?;

        if !response.is_success() {
            warn!(path = %path, status = response.status, "Request failed");
            return Err(KrakenError::Http {
                path,
                status: response.status,
                body: response.body,
            });
        }

        let envelope: ResponseEnvelope<R> = serde_json::from_str(&response.body)
            .map_err(|source| KrakenError::Decode {
                path: path.clone(),
                source,
            })?;

        if !envelope.errors.is_empty() {
            debug!(path = %path, errors = ?envelope.errors, "Exchange reported errors");
        }
        Ok(envelope)
    }

    // ==================== PUBLIC ENDPOINTS ====================

    /// Get the exchange's server time
    pub async fn server_time(&self) -> Result<ResponseEnvelope<ServerTime>> {
        self.query_public("Time", QueryArgs::new()).await
    }

    /// Get the exchange's operating status
    pub async fn system_status(&self) -> Result<ResponseEnvelope<SystemStatus>> {
        self.query_public("SystemStatus", QueryArgs::new()).await
    }

    /// Get asset metadata, optionally restricted to a comma-separated list
    pub async fn assets(
        &self,
        assets: Option<&str>,
    ) -> Result<ResponseEnvelope<HashMap<String, AssetInfo>>> {
        self.query_public("Assets", QueryArgs::new().opt("asset", assets))
            .await
    }

    /// Get ticker information for one or more comma-separated pairs
    pub async fn ticker(&self, pair: &str) -> Result<ResponseEnvelope<HashMap<String, TickerInfo>>> {
        if pair.trim().is_empty() {
            return Err(KrakenError::MissingArgument("pair"));
        }
        self.query_public("Ticker", QueryArgs::new().arg("pair", pair))
            .await
    }

    // ==================== PRIVATE ENDPOINTS ====================

    /// Get account balances
    pub async fn balance(&self) -> Result<ResponseEnvelope<Balances>> {
        self.query_private("Balance", QueryArgs::new()).await
    }

    /// Get margin and equity summary, valued in `asset` (default ZUSD)
    pub async fn trade_balance(&self, asset: Option<&str>) -> Result<ResponseEnvelope<TradeBalance>> {
        self.query_private("TradeBalance", QueryArgs::new().opt("asset", asset))
            .await
    }

    /// Get open orders
    pub async fn open_orders(&self, include_trades: bool) -> Result<ResponseEnvelope<OpenOrders>> {
        let args = QueryArgs::new().opt("trades", include_trades.then_some("true"));
        self.query_private("OpenOrders", args).await
    }

    /// Get trade history between optional unix timestamps
    pub async fn trades_history(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        offset: Option<u32>,
    ) -> Result<ResponseEnvelope<TradesHistory>> {
        let args = QueryArgs::new()
            .opt("start", start.map(|s| s.to_string()))
            .opt("end", end.map(|e| e.to_string()))
            .opt("ofs", offset.map(|o| o.to_string()));
        self.query_private_with_cost("TradesHistory", args, HISTORY_COST)
            .await
    }

    /// Get ledger entries, optionally for a comma-separated asset list
    pub async fn ledgers(
        &self,
        asset: Option<&str>,
        start: Option<i64>,
        end: Option<i64>,
        offset: Option<u32>,
    ) -> Result<ResponseEnvelope<Ledgers>> {
        let args = QueryArgs::new()
            .opt("asset", asset)
            .opt("start", start.map(|s| s.to_string()))
            .opt("end", end.map(|e| e.to_string()))
            .opt("ofs", offset.map(|o| o.to_string()));
        self.query_private_with_cost("Ledgers", args, HISTORY_COST)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    #[test]
    fn test_path_building() {
        assert_eq!(
            KrakenClient::<ReqwestTransport>::path("public", "Time").unwrap(),
            "/0/public/Time"
        );
        assert_eq!(
            KrakenClient::<ReqwestTransport>::path("private", "/Balance").unwrap(),
            "/0/private/Balance"
        );
        assert!(matches!(
            KrakenClient::<ReqwestTransport>::path("public", ""),
            Err(KrakenError::MissingArgument("method"))
        ));
    }

    #[test]
    fn test_client_creation() {
        let client = KrakenClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.kraken.com");
        assert_eq!(client.tier(), RateLimitTier::None);
        assert!(!client.public_limiter().is_limited());
        assert!(!client.private_limiter().is_limited());
    }

    #[test]
    fn test_tier_enables_both_limiters() {
        let config = ClientConfig::default().with_tier(RateLimitTier::Tier2);
        let creds = Credentials::new("key", SECRET).unwrap();
        let client = KrakenClient::with_credentials(config, creds).unwrap();

        assert_eq!(client.private_limiter().limit(), Some(15));
        assert_eq!(client.public_limiter().limit(), Some(1));
    }

    #[test]
    fn test_invalid_base_url_fails_construction() {
        let config = ClientConfig::default().with_base_url("::not a url::");
        assert!(matches!(
            KrakenClient::new(config),
            Err(KrakenError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let client = KrakenClient::new(ClientConfig::default()).unwrap();
        assert!(!client.is_closed().await);
        client.close().await;
        client.close().await;
        assert!(client.is_closed().await);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_calls() {
        let client = KrakenClient::new(ClientConfig::default()).unwrap();
        client.close().await;

        let err = client.server_time().await.unwrap_err();
        assert!(matches!(err, KrakenError::Disposed));
        assert!(err.is_programming_error());
    }

    #[tokio::test]
    async fn test_private_call_without_credentials() {
        let client = KrakenClient::new(ClientConfig::default()).unwrap();
        assert!(matches!(
            client.balance().await,
            Err(KrakenError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_pair_rejected() {
        let client = KrakenClient::new(ClientConfig::default()).unwrap();
        assert!(matches!(
            client.ticker(" ").await,
            Err(KrakenError::MissingArgument("pair"))
        ));
    }
}
