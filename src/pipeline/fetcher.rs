//! HTTP fetcher implementation
//!
//! This module handles every download made by the fetch workers:
//! - Building the HTTP client (fixed user agent, timeout, redirects followed)
//! - Certificate verification is disabled; results come from arbitrary sites
//! - Optionally bypassing intermediate caches on retry
//! - Error classification

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Maximum redirect hops followed per download
const MAX_REDIRECTS: usize = 10;

/// Whether a request may be answered from a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Default,
    /// Ask every cache on the path to revalidate with the origin
    Bypass,
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// Body text; only read for successful responses
    pub body: String,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// Transport-level download failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Downloads a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, cache: CachePolicy) -> Result<FetchResponse, FetchError>;
}

/// Builds the HTTP client used for result downloads
///
/// # Example
///
/// ```
/// use gsdl_harvest::config::FetchConfig;
/// use gsdl_harvest::pipeline::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, cache: CachePolicy) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);
        if cache == CachePolicy::Bypass {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            return Ok(FetchResponse {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let body = response.text().await?;
        Ok(FetchResponse {
            status: status.as_u16(),
            body,
        })
    }
}
