//! Form login with a client-generated nonce.
//!
//! The device answers the POST with a short text body instead of a page:
//! a success marker (usually a redirect path) or an explicit error marker.

use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument};
use url::Url;

use super::{AuthKind, AuthStrategy, detect_lockout, join_url};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::session::Session;

/// Form login that adds a random numeric nonce.
#[derive(Debug, Clone)]
pub struct NonceFormAuth {
    /// Path the form posts to.
    pub login_path: String,
    /// Username field name.
    pub username_field: String,
    /// Password field name.
    pub password_field: String,
    /// Nonce field name.
    pub nonce_field: String,
    /// Number of decimal digits in the nonce.
    pub nonce_digits: usize,
    /// Body text that confirms success.
    pub success_marker: String,
    /// Body text that signals rejected credentials.
    pub error_marker: String,
    /// Body text that signals a lockout.
    pub lockout_marker: Option<String>,
}

/// Generates `digits` random decimal digits.
pub fn generate_nonce(digits: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; digits];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::Transport("system random source unavailable".to_string()))?;
    Ok(bytes.iter().map(|b| char::from(b'0' + b % 10)).collect())
}

#[async_trait]
impl AuthStrategy for NonceFormAuth {
    fn id(&self) -> &str {
        "form_nonce"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::FormNonce
    }

    #[instrument(skip_all, fields(login_path = %self.login_path))]
    async fn authenticate(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let nonce = generate_nonce(self.nonce_digits)?;
        let fields = [
            (self.username_field.as_str(), credentials.username.as_str()),
            (self.password_field.as_str(), credentials.password()),
            (self.nonce_field.as_str(), nonce.as_str()),
        ];

        let url = join_url(base, &self.login_path)?;
        let response = ctx.http.send(ctx.http.post(url).form(&fields)).await?;
        session.absorb_cookies(&response);

        if let Some(cooldown) = detect_lockout(
            &response,
            self.lockout_marker.as_deref(),
            ctx.settings.default_lockout,
        ) {
            return Err(AuthError::Lockout { cooldown });
        }

        let body = response.body.trim();
        if body.contains(self.error_marker.as_str()) {
            return Err(AuthError::WrongCredentials(format!(
                "device answered {:?}",
                truncate(body)
            )));
        }
        if body.contains(self.success_marker.as_str()) {
            debug!("Nonce login accepted");
            return Ok(());
        }

        Err(AuthError::MalformedResponse(format!(
            "expected {:?} or {:?}, got {:?}",
            self.success_marker,
            self.error_marker,
            truncate(body)
        )))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(80) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
