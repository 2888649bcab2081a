//! Fetched pages and the resources that produce them.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};
use url::Url;

/// Password input anywhere in the body.
static PASSWORD_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input[^>]*type\s*=\s*["']?password"#).expect("Invalid regex")
});

/// `<meta http-equiv="refresh" content="0; url=...">`
static META_REFRESH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta[^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*content\s*=\s*["'][^"']*url\s*=\s*([^"'>\s]+)"#,
    )
    .expect("Invalid regex")
});

// ============================================================================
// Resource
// ============================================================================

/// Something a profile fetches from a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    /// A plain page, fetched with GET.
    Page {
        /// Path relative to the device base URL.
        path: String,
    },
    /// One batched HNAP request asking for several actions.
    Hnap {
        /// Action names, e.g. `GetMotoStatusDownstreamChannelInfo`.
        actions: Vec<String>,
    },
}

impl Resource {
    /// Creates a page resource.
    pub fn page(path: impl Into<String>) -> Self {
        Self::Page { path: path.into() }
    }

    /// Creates a batched HNAP resource.
    pub fn hnap<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Hnap {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the page path, if this is a page.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Page { path } => Some(path),
            Self::Hnap { .. } => None,
        }
    }

    /// Short label for logs and probe reports.
    pub fn label(&self) -> String {
        match self {
            Self::Page { path } => path.clone(),
            Self::Hnap { actions } => format!("HNAP[{}]", actions.join(",")),
        }
    }
}

// ============================================================================
// Control Request
// ============================================================================

/// A state-changing request, such as a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Form POST to a page.
    Form {
        /// Target path.
        path: String,
        /// Form fields in order.
        #[serde(default)]
        fields: Vec<(String, String)>,
    },
    /// Single HNAP action.
    Hnap {
        /// Action name, e.g. `SetStatusSecuritySettings`.
        action: String,
        /// Action body.
        #[serde(default)]
        body: serde_json::Value,
    },
}

// ============================================================================
// Fetched Page
// ============================================================================

/// One response from a device.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final request URL.
    pub url: Url,
    /// HTTP status.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// When the response arrived.
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// Creates a page with empty headers.
    pub fn new(url: Url, status: u16, body: impl Into<String>) -> Self {
        Self {
            url,
            status,
            body: body.into(),
            headers: HeaderMap::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for a 3xx status.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Returns a header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Location` header.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Parses `Retry-After` as whole seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Returns `(name, value)` pairs from every `Set-Cookie` header.
    pub fn set_cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect()
    }

    /// Returns true if the body contains a password input.
    pub fn looks_like_login_form(&self) -> bool {
        PASSWORD_INPUT_RE.is_match(&self.body)
    }

    /// Returns the target of a `<meta http-equiv="refresh">` tag.
    pub fn meta_refresh_target(&self) -> Option<String> {
        META_REFRESH_RE
            .captures(&self.body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Returns the redirect target from either `Location` or a meta refresh.
    pub fn redirect_target(&self) -> Option<String> {
        if self.is_redirect() {
            if let Some(location) = self.location() {
                return Some(location.to_string());
            }
        }
        self.meta_refresh_target()
    }
}

fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn page(body: &str) -> FetchedPage {
        FetchedPage::new(Url::parse("http://192.168.100.1/").unwrap(), 200, body)
    }

    #[test]
    fn test_login_form_detection() {
        let login = page(r#"<form><input type="password" name="loginPassword"></form>"#);
        assert!(login.looks_like_login_form());

        let data = page("<table><tr><td>Downstream Bonded Channels</td></tr></table>");
        assert!(!data.looks_like_login_form());
    }

    #[test]
    fn test_meta_refresh_target() {
        let p = page(r#"<html><meta http-equiv="refresh" content="0; url=/status.asp"></html>"#);
        assert_eq!(p.meta_refresh_target().as_deref(), Some("/status.asp"));
        assert!(page("<html></html>").meta_refresh_target().is_none());
    }

    #[test]
    fn test_set_cookie_parsing() {
        let mut p = page("");
        p.headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("sessionId=abc123; Path=/; HttpOnly"),
        );
        p.headers
            .append(header::SET_COOKIE, HeaderValue::from_static("credential=tok"));
        assert_eq!(
            p.set_cookies(),
            vec![
                ("sessionId".to_string(), "abc123".to_string()),
                ("credential".to_string(), "tok".to_string()),
            ]
        );
    }

    #[test]
    fn test_resource_serde() {
        let json = r#"{"type":"hnap","actions":["GetMotoStatusStartupSequence"]}"#;
        let res: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(res, Resource::hnap(["GetMotoStatusStartupSequence"]));
        assert_eq!(Resource::page("/cmconnectionstatus.html").path(), Some("/cmconnectionstatus.html"));
    }
}
