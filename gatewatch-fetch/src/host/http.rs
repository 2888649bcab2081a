//! HTTP client for talking to modems.
//!
//! This module wraps `reqwest` so that:
//! - every request carries the configured timeout
//! - redirects are never followed implicitly (login flows inspect them)
//! - self-signed device certificates are accepted
//! - responses are buffered into a [`FetchedPage`]

use reqwest::{Client, RequestBuilder, redirect};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;
use crate::page::FetchedPage;

/// User agent string for gatewatch.
const USER_AGENT: &str = concat!("gatewatch/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with a mandatory timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            inner: client,
            timeout,
        })
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts a GET request.
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.inner.get(url)
    }

    /// Starts a POST request.
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.inner.post(url)
    }

    /// Sends a request and buffers the response.
    ///
    /// Non-2xx statuses are returned as pages; callers decide what an error
    /// status means for them.
    #[instrument(skip(self, request))]
    pub async fn send(&self, request: RequestBuilder) -> Result<FetchedPage, FetchError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(&e))?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(%url, status, "Response received");

        let body = response.text().await.map_err(|e| self.map_error(&e))?;

        let mut page = FetchedPage::new(url, status, body);
        page.headers = headers;
        Ok(page)
    }

    /// Sends a request and fails on non-2xx, non-3xx statuses.
    pub async fn send_checked(&self, request: RequestBuilder) -> Result<FetchedPage, FetchError> {
        let page = self.send(request).await?;
        if page.is_success() || page.is_redirect() {
            Ok(page)
        } else {
            Err(FetchError::HttpStatus {
                status: page.status,
                url: page.url.to_string(),
            })
        }
    }

    fn map_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_builder() {
            FetchError::InvalidUrl(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
