//! Unauthenticated probes used during discovery.

use futures::future::join_all;
use std::time::Instant;
use tracing::debug;
use url::Url;

use crate::auth::join_url;
use crate::context::FetchContext;
use crate::page::FetchedPage;

/// Result of a probe check.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Probed path.
    pub path: String,
    /// Response time in milliseconds.
    pub response_time_ms: u64,
    /// Page, if the device answered at all.
    pub page: Option<FetchedPage>,
    /// Error message, if it did not.
    pub error: Option<String>,
}

impl ProbeResult {
    /// Returns the HTTP status, if any.
    pub fn status(&self) -> Option<u16> {
        self.page.as_ref().map(|p| p.status)
    }

    /// Returns true if the device answered with a 2xx.
    pub fn is_success(&self) -> bool {
        self.page.as_ref().is_some_and(FetchedPage::is_success)
    }

    /// Returns the body, if any.
    pub fn body(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.body.as_str())
    }
}

/// A single unauthenticated GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Path relative to the device base URL.
    pub path: String,
}

impl Probe {
    /// Creates a new probe for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Executes the probe and returns the result.
    pub async fn check(&self, ctx: &FetchContext, base: &Url) -> ProbeResult {
        let start = Instant::now();
        debug!(path = %self.path, "Running probe");

        let outcome = match join_url(base, &self.path) {
            Ok(url) => ctx.http.send(ctx.http.get(url)).await,
            Err(e) => Err(e),
        };
        let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(page) => ProbeResult {
                path: self.path.clone(),
                response_time_ms,
                page: Some(page),
                error: None,
            },
            Err(e) => ProbeResult {
                path: self.path.clone(),
                response_time_ms,
                page: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Runs multiple probes concurrently, preserving order.
pub async fn run_probes(probes: &[Probe], ctx: &FetchContext, base: &Url) -> Vec<ProbeResult> {
    let futures: Vec<_> = probes.iter().map(|p| p.check(ctx, base)).collect();
    join_all(futures).await
}
