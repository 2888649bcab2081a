//! Authentication strategies.
//!
//! Each strategy knows how to turn [`Credentials`] into an authenticated
//! [`Session`] for one family of device firmware, and how to issue data
//! requests under that session.
//!
//! - [`none::NoAuth`] - devices that serve status pages openly
//! - [`basic::BasicAuth`] - HTTP Basic on every request
//! - [`form::FormAuth`] - form POST, session cookie
//! - [`nonce::NonceFormAuth`] - form POST with a client nonce and text markers
//! - [`token::UrlTokenAuth`] - credentials in the URL, token appended to pages
//! - [`redirect::RedirectAuth`] - form POST answered by a meta refresh
//! - [`hnap::HnapAuth`] - HNAP challenge/response over JSON

pub mod basic;
pub mod form;
pub mod hnap;
pub mod nonce;
pub mod none;
pub mod redirect;
pub mod token;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{RequestBuilder, header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::{AuthError, FetchError};
use crate::page::{ControlRequest, FetchedPage, Resource};
use crate::session::Session;

pub use basic::BasicAuth;
pub use form::FormAuth;
pub use hnap::{HnapAuth, HnapDigest};
pub use nonce::NonceFormAuth;
pub use none::NoAuth;
pub use redirect::RedirectAuth;
pub use token::UrlTokenAuth;

/// Redirect hops followed after a login POST.
const MAX_LOGIN_REDIRECTS: usize = 3;

/// "try again in 60 seconds" and similar.
static COOLDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(seconds?|secs?|minutes?|mins?)\b").expect("Invalid regex")
});

// ============================================================================
// Auth Kind
// ============================================================================

/// The family of login mechanism a strategy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// No authentication.
    None,
    /// HTTP Basic.
    Basic,
    /// Form POST with a session cookie.
    Form,
    /// Form POST with a client nonce.
    FormNonce,
    /// Credentials encoded into the URL.
    UrlToken,
    /// Form POST followed by a meta refresh.
    Redirect,
    /// HNAP challenge/response.
    Hnap,
}

impl AuthKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic => "HTTP Basic",
            Self::Form => "Form",
            Self::FormNonce => "Form + Nonce",
            Self::UrlToken => "URL Token",
            Self::Redirect => "Meta Redirect",
            Self::Hnap => "HNAP",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Auth Strategy Trait
// ============================================================================

/// One way of logging in to a device and fetching under the resulting session.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Stable identifier, e.g. `"hnap.sha256"`.
    fn id(&self) -> &str;

    /// Mechanism family.
    fn kind(&self) -> AuthKind;

    /// Returns true if the strategy keeps no server-side session.
    ///
    /// For stateless strategies a 401 on a data page means the credentials
    /// themselves are wrong.
    fn is_stateless(&self) -> bool {
        false
    }

    /// Establishes a session.
    ///
    /// On failure the session may be partially filled and must be discarded.
    async fn authenticate(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthError>;

    /// Resolves a page path against the device URL.
    fn page_url(&self, base: &Url, path: &str, _session: &Session) -> Result<Url, FetchError> {
        join_url(base, path)
    }

    /// Adds session material to an outgoing request.
    fn decorate(
        &self,
        request: RequestBuilder,
        session: &Session,
        _credentials: &Credentials,
    ) -> RequestBuilder {
        with_cookies(request, session)
    }

    /// Fetches one resource under the session.
    async fn fetch(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &Session,
        credentials: &Credentials,
        resource: &Resource,
    ) -> Result<FetchedPage, FetchError> {
        match resource {
            Resource::Page { path } => {
                let url = self.page_url(base, path, session)?;
                debug!(strategy = self.id(), %url, "Fetching page");
                let request = self.decorate(ctx.http.get(url), session, credentials);
                ctx.http.send(request).await
            }
            Resource::Hnap { .. } => Err(FetchError::Unsupported(format!(
                "{} cannot issue HNAP requests",
                self.id()
            ))),
        }
    }

    /// Sends a state-changing request such as a restart.
    async fn send_control(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &Session,
        credentials: &Credentials,
        control: &ControlRequest,
    ) -> Result<FetchedPage, FetchError> {
        match control {
            ControlRequest::Form { path, fields } => {
                let url = self.page_url(base, path, session)?;
                let request = self.decorate(ctx.http.post(url).form(fields), session, credentials);
                ctx.http.send_checked(request).await
            }
            ControlRequest::Hnap { action, .. } => Err(FetchError::Unsupported(format!(
                "{} cannot send HNAP action {action}",
                self.id()
            ))),
        }
    }
}

// ============================================================================
// Auth Spec
// ============================================================================

fn default_hnap_endpoint() -> String {
    "/HNAP1/".to_string()
}

fn default_nonce_digits() -> usize {
    5
}

/// Declarative description of a strategy, as stored on a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AuthSpec {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic.
    Basic,
    /// Form POST with a session cookie.
    Form {
        /// Path the form posts to.
        login_path: String,
        /// Username field name.
        username_field: String,
        /// Password field name.
        password_field: String,
        /// Additional fixed fields.
        #[serde(default)]
        extra_fields: Vec<(String, String)>,
        /// Body text that confirms success.
        #[serde(default)]
        success_marker: Option<String>,
        /// Body text that signals rejected credentials.
        #[serde(default)]
        error_marker: Option<String>,
        /// Cookie that must be set on success.
        #[serde(default)]
        session_cookie: Option<String>,
    },
    /// Form POST with a client nonce.
    FormNonce {
        /// Path the form posts to.
        login_path: String,
        /// Username field name.
        username_field: String,
        /// Password field name.
        password_field: String,
        /// Nonce field name.
        nonce_field: String,
        /// Number of decimal digits in the nonce.
        #[serde(default = "default_nonce_digits")]
        nonce_digits: usize,
        /// Body text that confirms success.
        success_marker: String,
        /// Body text that signals rejected credentials.
        error_marker: String,
        /// Body text that signals a lockout.
        #[serde(default)]
        lockout_marker: Option<String>,
    },
    /// Credentials encoded into the URL.
    UrlToken {
        /// Page that accepts the encoded credentials.
        login_path: String,
    },
    /// Form POST followed by a meta refresh.
    Redirect {
        /// Path the form posts to.
        login_path: String,
        /// Username field name.
        username_field: String,
        /// Password field name.
        password_field: String,
        /// Redirect target fragment meaning "back to login".
        login_marker: String,
    },
    /// HNAP challenge/response.
    Hnap {
        /// HNAP endpoint path.
        #[serde(default = "default_hnap_endpoint")]
        endpoint: String,
        /// HMAC digest the firmware uses.
        digest: HnapDigest,
    },
}

impl AuthSpec {
    /// Mechanism family.
    pub fn kind(&self) -> AuthKind {
        match self {
            Self::None => AuthKind::None,
            Self::Basic => AuthKind::Basic,
            Self::Form { .. } => AuthKind::Form,
            Self::FormNonce { .. } => AuthKind::FormNonce,
            Self::UrlToken { .. } => AuthKind::UrlToken,
            Self::Redirect { .. } => AuthKind::Redirect,
            Self::Hnap { .. } => AuthKind::Hnap,
        }
    }

    /// Builds the strategy this spec describes.
    pub fn build(&self) -> Arc<dyn AuthStrategy> {
        match self.clone() {
            Self::None => Arc::new(NoAuth),
            Self::Basic => Arc::new(BasicAuth),
            Self::Form {
                login_path,
                username_field,
                password_field,
                extra_fields,
                success_marker,
                error_marker,
                session_cookie,
            } => Arc::new(FormAuth {
                login_path,
                username_field,
                password_field,
                extra_fields,
                success_marker,
                error_marker,
                session_cookie,
            }),
            Self::FormNonce {
                login_path,
                username_field,
                password_field,
                nonce_field,
                nonce_digits,
                success_marker,
                error_marker,
                lockout_marker,
            } => Arc::new(NonceFormAuth {
                login_path,
                username_field,
                password_field,
                nonce_field,
                nonce_digits,
                success_marker,
                error_marker,
                lockout_marker,
            }),
            Self::UrlToken { login_path } => Arc::new(UrlTokenAuth::new(login_path)),
            Self::Redirect {
                login_path,
                username_field,
                password_field,
                login_marker,
            } => Arc::new(RedirectAuth {
                login_path,
                username_field,
                password_field,
                login_marker,
            }),
            Self::Hnap { endpoint, digest } => Arc::new(HnapAuth::new(endpoint, digest)),
        }
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Joins a device-relative path onto the base URL.
pub fn join_url(base: &Url, path: &str) -> Result<Url, FetchError> {
    base.join(path)
        .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))
}

/// Attaches the session's cookies, if any.
pub fn with_cookies(request: RequestBuilder, session: &Session) -> RequestBuilder {
    match session.cookie_header() {
        Some(cookies) => request.header(header::COOKIE, cookies),
        None => request,
    }
}

/// Follows redirects after a login POST, collecting cookies on the way.
///
/// Returns the last page reached.
pub(crate) async fn follow_login_redirects(
    ctx: &FetchContext,
    mut page: FetchedPage,
    session: &mut Session,
) -> Result<FetchedPage, AuthError> {
    for _ in 0..MAX_LOGIN_REDIRECTS {
        let Some(location) = page.location().filter(|_| page.is_redirect()) else {
            break;
        };
        let url = page
            .url
            .join(location)
            .map_err(|e| AuthError::MalformedResponse(format!("bad redirect {location}: {e}")))?;
        debug!(%url, "Following login redirect");
        let request = with_cookies(ctx.http.get(url), session);
        page = ctx.http.send(request).await?;
        session.absorb_cookies(&page);
    }
    Ok(page)
}

/// Detects a device-imposed lockout in a response.
///
/// HTTP 429 or a body containing `marker` counts as a lockout. The cooldown
/// comes from `Retry-After`, then from a "N seconds/minutes" phrase in the
/// body, then from `fallback`.
pub fn detect_lockout(
    page: &FetchedPage,
    marker: Option<&str>,
    fallback: Duration,
) -> Option<Duration> {
    let body_hit = marker.is_some_and(|m| page.body.contains(m));
    if page.status != 429 && !body_hit {
        return None;
    }
    if let Some(secs) = page.retry_after_secs() {
        return Some(Duration::from_secs(secs));
    }
    Some(cooldown_from_text(&page.body).unwrap_or(fallback))
}

/// Reads "try again in 5 minutes" style phrases.
pub fn cooldown_from_text(text: &str) -> Option<Duration> {
    let caps = COOLDOWN_RE.captures(text)?;
    let amount: u64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let secs = if unit.starts_with("min") {
        amount.saturating_mul(60)
    } else {
        amount
    };
    Some(Duration::from_secs(secs))
}

// ============================================================================
// Tests
// ============================================================================
