//! Client configuration
//!
//! Rate-limit tiers, base URL and HTTP settings, with environment variable
//! support for deployments that configure the client through `.env` files.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::common::RateLimiterConfig;
use crate::error::{KrakenError, Result};

/// Production REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

const DEFAULT_USER_AGENT: &str = concat!("kraken-rest/", env!("CARGO_PKG_VERSION"));

/// Budgets applied to one client when a tier is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub public: RateLimiterConfig,
    pub private: RateLimiterConfig,
}

const PUBLIC_LIMITS: RateLimiterConfig = RateLimiterConfig::new(1, Duration::from_secs(1));

const TIER_LIMITS: [(RateLimitTier, TierLimits); 3] = [
    (
        RateLimitTier::Tier2,
        TierLimits {
            public: PUBLIC_LIMITS,
            private: RateLimiterConfig::new(15, Duration::from_secs(3)),
        },
    ),
    (
        RateLimitTier::Tier3,
        TierLimits {
            public: PUBLIC_LIMITS,
            private: RateLimiterConfig::new(20, Duration::from_secs(2)),
        },
    ),
    (
        RateLimitTier::Tier4,
        TierLimits {
            public: PUBLIC_LIMITS,
            private: RateLimiterConfig::new(20, Duration::from_secs(1)),
        },
    ),
];

/// Account verification tier, which determines the call-rate budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitTier {
    /// Rate limiting disabled
    #[default]
    None,
    /// Starter
    Tier2,
    /// Intermediate
    Tier3,
    /// Pro
    Tier4,
}

impl RateLimitTier {
    /// Budgets for this tier; `None` means calls are not limited
    pub fn limits(self) -> Option<TierLimits> {
        TIER_LIMITS
            .iter()
            .find(|(tier, _)| *tier == self)
            .map(|(_, limits)| *limits)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tier2 => "tier2",
            Self::Tier3 => "tier3",
            Self::Tier4 => "tier4",
        }
    }
}

/// Unrecognized names fall back to `None` (no limiting)
impl FromStr for RateLimitTier {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tier = match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "tier2" | "2" | "starter" => Self::Tier2,
            "tier3" | "3" | "intermediate" => Self::Tier3,
            "tier4" | "4" | "pro" => Self::Tier4,
            _ => Self::None,
        };
        Ok(tier)
    }
}

impl fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub tier: RateLimitTier,
    /// Request timeout for the default transport
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tier: RateLimitTier::None,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Set base URL (e.g. a sandbox or a local proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set rate-limit tier
    pub fn with_tier(mut self, tier: RateLimitTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load overrides from the environment
    ///
    /// Reads `KRAKEN_BASE_URL` and `KRAKEN_RATE_LIMIT_TIER`; unset variables
    /// keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("KRAKEN_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(tier) = std::env::var("KRAKEN_RATE_LIMIT_TIER") {
            config.tier = tier.parse().unwrap_or_default();
        }
        config
    }

    /// Check the base URL and return it without a trailing slash
    pub fn validated_base_url(&self) -> Result<String> {
        let url = reqwest::Url::parse(self.base_url.trim())
            .map_err(|e| KrakenError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(KrakenError::Config(format!(
                "base URL must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(KrakenError::Config(
                "base URL must not carry a query or fragment".to_string(),
            ));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.kraken.com");
        assert_eq!(config.tier, RateLimitTier::None);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::default()
            .with_base_url("http://localhost:8080/")
            .with_tier(RateLimitTier::Tier3)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.tier, RateLimitTier::Tier3);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.validated_base_url().unwrap(), "http://localhost:8080");
    }

    #[test]
    fn test_tier_table() {
        assert_eq!(RateLimitTier::None.limits(), None);

        let starter = RateLimitTier::Tier2.limits().unwrap();
        assert_eq!(starter.private.limit, 15);
        assert_eq!(starter.private.decay_interval, Duration::from_secs(3));

        let intermediate = RateLimitTier::Tier3.limits().unwrap();
        assert_eq!(intermediate.private.limit, 20);
        assert_eq!(intermediate.private.decay_interval, Duration::from_secs(2));

        let pro = RateLimitTier::Tier4.limits().unwrap();
        assert_eq!(pro.private.limit, 20);
        assert_eq!(pro.private.decay_interval, Duration::from_secs(1));

        for tier in [RateLimitTier::Tier2, RateLimitTier::Tier3, RateLimitTier::Tier4] {
            assert_eq!(tier.limits().unwrap().public, PUBLIC_LIMITS);
        }
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("tier2".parse::<RateLimitTier>(), Ok(RateLimitTier::Tier2));
        assert_eq!("Tier-3".parse::<RateLimitTier>(), Ok(RateLimitTier::Tier3));
        assert_eq!("pro".parse::<RateLimitTier>(), Ok(RateLimitTier::Tier4));
        assert_eq!("4".parse::<RateLimitTier>(), Ok(RateLimitTier::Tier4));
        assert_eq!("none".parse::<RateLimitTier>(), Ok(RateLimitTier::None));
        assert_eq!("platinum".parse::<RateLimitTier>(), Ok(RateLimitTier::None));
        assert_eq!("".parse::<RateLimitTier>(), Ok(RateLimitTier::None));
    }

    #[test]
    fn test_tier_display_round_trips() {
        for tier in [
            RateLimitTier::None,
            RateLimitTier::Tier2,
            RateLimitTier::Tier3,
            RateLimitTier::Tier4,
        ] {
            assert_eq!(tier.to_string().parse::<RateLimitTier>(), Ok(tier));
        }
    }

    #[test]
    fn test_invalid_base_urls() {
        for bad in ["not a url", "ftp://api.kraken.com", "https://api.kraken.com?x=1"] {
            let config = ClientConfig::default().with_base_url(bad);
            assert!(matches!(
                config.validated_base_url(),
                Err(KrakenError::Config(_))
            ));
        }
    }

    #[test]
    fn test_default_base_url_is_valid() {
        assert_eq!(
            ClientConfig::default().validated_base_url().unwrap(),
            DEFAULT_BASE_URL
        );
    }
}
