//! Credentials encoded into the URL, answered with a session token.
//!
//! Login is `GET <login_path>?login_<base64(user:pass)>` with the same value
//! as HTTP Basic. A bare alphanumeric body is the token; every later page is
//! requested as `<path>?ct_<token>`.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header;
use tracing::{debug, instrument};
use url::Url;

use super::{AuthKind, AuthStrategy, detect_lockout, join_url};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::{AuthError, FetchError};
use crate::session::Session;

/// URL-token login.
#[derive(Debug, Clone)]
pub struct UrlTokenAuth {
    login_path: String,
}

impl UrlTokenAuth {
    /// Creates the strategy for a login page.
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// Base64 of `user:pass`.
    pub fn encode_credentials(credentials: &Credentials) -> String {
        STANDARD.encode(format!("{}:{}", credentials.username, credentials.password()))
    }
}

fn is_token(body: &str) -> bool {
    !body.is_empty() && body.len() <= 256 && body.chars().all(|c| c.is_ascii_alphanumeric())
}

#[async_trait]
impl AuthStrategy for UrlTokenAuth {
    fn id(&self) -> &str {
        "url_token"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::UrlToken
    }

    #[instrument(skip_all, fields(login_path = %self.login_path))]
    async fn authenticate(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let encoded = Self::encode_credentials(credentials);
        let mut url = join_url(base, &self.login_path)?;
        url.set_query(Some(&format!("login_{encoded}")));

        let request = ctx
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Basic {encoded}"));
        let response = ctx.http.send(request).await?;
        session.absorb_cookies(&response);

        if let Some(cooldown) = detect_lockout(&response, None, ctx.settings.default_lockout) {
            return Err(AuthError::Lockout { cooldown });
        }
        if response.status == 401 || response.looks_like_login_form() {
            return Err(AuthError::WrongCredentials(
                "device returned the login page".to_string(),
            ));
        }
        if !response.is_success() {
            return Err(AuthError::MalformedResponse(format!(
                "token request returned HTTP {}",
                response.status
            )));
        }

        let token = response.body.trim();
        if !is_token(token) {
            return Err(AuthError::MalformedResponse(
                "token response is not a bare token".to_string(),
            ));
        }

        debug!(token_len = token.len(), "Session token issued");
        session.set_token(token);
        Ok(())
    }

    fn page_url(&self, base: &Url, path: &str, session: &Session) -> Result<Url, FetchError> {
        let mut url = join_url(base, path)?;
        if let Some(token) = session.token() {
            url.set_query(Some(&format!("ct_{token}")));
        }
        Ok(url)
    }
}
