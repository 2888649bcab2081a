//! Fetch context shared by every device.
//!
//! The context bundles the HTTP client with the settings that govern
//! timeouts, retries and failure thresholds.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::host::http::HttpClient;
use crate::retry::RetryStrategy;

/// Default cooldown when a device locks us out without saying for how long.
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(300);

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Timeout for every request.
    pub timeout: Duration,
    /// Retry policy for idempotent reads.
    pub retry: RetryStrategy,
    /// Consecutive authentication failures before giving up.
    pub max_auth_failures: u32,
    /// Consecutive failed cycles before a device is reported unavailable.
    pub unavailable_after: u32,
    /// Idle time after which a session is discarded before use.
    pub session_max_idle: Option<Duration>,
    /// Cooldown applied when a lockout carries no duration.
    pub default_lockout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryStrategy::default(),
            max_auth_failures: 3,
            unavailable_after: 3,
            session_max_idle: None,
            default_lockout: DEFAULT_LOCKOUT,
        }
    }
}

impl FetchSettings {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }
}

// ============================================================================
// Fetch Context
// ============================================================================

/// Context handed to strategies and orchestrators.
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// HTTP client.
    pub http: Arc<HttpClient>,
    /// Fetch settings.
    pub settings: FetchSettings,
}

impl FetchContext {
    /// Creates a context with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(FetchSettings::default())
    }

    /// Creates a context with custom settings.
    pub fn with_settings(settings: FetchSettings) -> Result<Self, FetchError> {
        Ok(Self {
            http: Arc::new(HttpClient::new(settings.timeout)?),
            settings,
        })
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Debug, Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    settings: FetchSettings,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the fetch settings.
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryStrategy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Sets the authentication failure limit.
    pub fn max_auth_failures(mut self, limit: u32) -> Self {
        self.settings.max_auth_failures = limit;
        self
    }

    /// Sets how many failed cycles mark a device unavailable.
    pub fn unavailable_after(mut self, cycles: u32) -> Self {
        self.settings.unavailable_after = cycles;
        self
    }

    /// Sets the session idle limit.
    pub fn session_max_idle(mut self, idle: Duration) -> Self {
        self.settings.session_max_idle = Some(idle);
        self
    }

    /// Builds the fetch context.
    pub fn build(self) -> Result<FetchContext, FetchError> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::new(self.settings.timeout)?),
        };
        Ok(FetchContext {
            http,
            settings: self.settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
