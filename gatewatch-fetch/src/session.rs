//! Authenticated session state.
//!
//! A [`Session`] is owned by exactly one device's orchestrator and is only
//! mutated from inside its polling cycle.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::auth::AuthKind;
use crate::page::FetchedPage;

/// Cookies, tokens and derived keys for one device.
#[derive(Debug, Clone)]
pub struct Session {
    strategy: AuthKind,
    cookies: BTreeMap<String, String>,
    token: Option<String>,
    private_key: Option<String>,
    created_at: DateTime<Utc>,
    last_valid_use: DateTime<Utc>,
    consecutive_failures: u32,
    expired: bool,
}

impl Session {
    /// Creates an empty session for the given strategy.
    pub fn new(strategy: AuthKind) -> Self {
        let now = Utc::now();
        Self {
            strategy,
            cookies: BTreeMap::new(),
            token: None,
            private_key: None,
            created_at: now,
            last_valid_use: now,
            consecutive_failures: 0,
            expired: false,
        }
    }

    /// Strategy that owns this session.
    pub fn strategy(&self) -> AuthKind {
        self.strategy
    }

    // ------------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------------

    /// Sets a cookie.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Returns a cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Stores every `Set-Cookie` from a response.
    pub fn absorb_cookies(&mut self, page: &FetchedPage) {
        for (name, value) in page.set_cookies() {
            self.cookies.insert(name, value);
        }
    }

    /// Formats cookies for a `Cookie` request header.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    /// Session token used in URLs.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Sets the URL session token.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// HNAP private key derived at login.
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    /// Sets the HNAP private key.
    pub fn set_private_key(&mut self, key: impl Into<String>) {
        self.private_key = Some(key.into());
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// When the session was established.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last time a data page was served under this session.
    pub fn last_valid_use(&self) -> DateTime<Utc> {
        self.last_valid_use
    }

    /// Records a successful use and clears the failure count.
    pub fn mark_valid_use(&mut self) {
        self.last_valid_use = Utc::now();
        self.consecutive_failures = 0;
    }

    /// Records a failed fetch under this session.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Consecutive failed fetches.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Marks the session unusable.
    pub fn mark_expired(&mut self) {
        self.expired = true;
    }

    /// Returns true once marked expired.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Returns true if the session may still be used.
    ///
    /// With `max_idle` set, a session that has not served data for longer
    /// than that is treated as expired.
    pub fn is_fresh(&self, max_idle: Option<Duration>) -> bool {
        if self.expired {
            return false;
        }
        match max_idle {
            Some(limit) => {
                let idle = Utc::now().signed_duration_since(self.last_valid_use);
                idle.to_std().map_or(true, |idle| idle <= limit)
            }
            None => true,
        }
    }
}
