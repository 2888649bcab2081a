//! Form login answered with a meta refresh.

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use super::{AuthKind, AuthStrategy, detect_lockout, join_url, with_cookies};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::session::Session;

/// Posts the login form and judges the outcome by where the device sends us.
#[derive(Debug, Clone)]
pub struct RedirectAuth {
    /// Path the form posts to.
    pub login_path: String,
    /// Username field name.
    pub username_field: String,
    /// Password field name.
    pub password_field: String,
    /// Redirect target fragment meaning "back to login".
    pub login_marker: String,
}

#[async_trait]
impl AuthStrategy for RedirectAuth {
    fn id(&self) -> &str {
        "redirect"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::Redirect
    }

    #[instrument(skip_all, fields(login_path = %self.login_path))]
    async fn authenticate(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let fields = [
            (self.username_field.as_str(), credentials.username.as_str()),
            (self.password_field.as_str(), credentials.password()),
        ];
        let url = join_url(base, &self.login_path)?;
        let response = ctx.http.send(ctx.http.post(url).form(&fields)).await?;
        session.absorb_cookies(&response);

        if let Some(cooldown) = detect_lockout(&response, None, ctx.settings.default_lockout) {
            return Err(AuthError::Lockout { cooldown });
        }

        let Some(target) = response.redirect_target() else {
            if response.looks_like_login_form() {
                return Err(AuthError::WrongCredentials(
                    "device returned the login form".to_string(),
                ));
            }
            return Err(AuthError::MalformedResponse(
                "login response carried no redirect".to_string(),
            ));
        };

        if target.contains(self.login_marker.as_str()) {
            return Err(AuthError::WrongCredentials(format!(
                "redirected back to {target}"
            )));
        }

        // Visiting the target is what activates the session on some firmware.
        let landing = response
            .url
            .join(&target)
            .map_err(|e| AuthError::MalformedResponse(format!("bad redirect {target}: {e}")))?;
        debug!(%landing, "Following post-login redirect");
        let page = ctx.http.send(with_cookies(ctx.http.get(landing), session)).await?;
        session.absorb_cookies(&page);

        if page.looks_like_login_form() {
            return Err(AuthError::WrongCredentials(
                "redirect target served the login form".to_string(),
            ));
        }
        Ok(())
    }
}
