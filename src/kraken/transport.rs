//! HTTP transport used by the client
//!
//! The client only needs "POST these bytes with these headers and give me the
//! status and body back". [`ReqwestTransport`] is the default; tests and
//! callers with special networking needs can supply their own [`Transport`].

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{KrakenError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// A fully prepared POST request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL
    pub url: String,
    /// API path, e.g. `/0/private/Balance`; used for error context
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    /// Encoded form body, sent as-is
    pub body: String,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync + 'static {
    fn post(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Default transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| KrakenError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    pub fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            url,
            path,
            headers,
            body,
        } = request;

        let mut builder = self
            .http_client
            .post(&url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let network = |source| KrakenError::Network {
            path: path.clone(),
            source,
        };

        let response = builder.body(body).send().await.map_err(network)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network)?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_header_lookup() {
        let request = HttpRequest {
            url: "https://api.kraken.com/0/private/Balance".to_string(),
            path: "/0/private/Balance".to_string(),
            headers: vec![("API-Key", "key".to_string())],
            body: "nonce=1".to_string(),
        };
        assert_eq!(request.header("api-key"), Some("key"));
        assert_eq!(request.header("API-Sign"), None);
    }

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        let bad = HttpResponse {
            status: 520,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }
}
