//! Form login with a session cookie.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{AuthKind, AuthStrategy, detect_lockout, follow_login_redirects, join_url};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::session::Session;

/// Posts the credentials as a form and keeps the cookies the device sets.
#[derive(Debug, Clone)]
pub struct FormAuth {
    /// Path the form posts to.
    pub login_path: String,
    /// Username field name.
    pub username_field: String,
    /// Password field name.
    pub password_field: String,
    /// Additional fixed fields.
    pub extra_fields: Vec<(String, String)>,
    /// Body text that confirms success.
    pub success_marker: Option<String>,
    /// Body text that signals rejected credentials.
    pub error_marker: Option<String>,
    /// Cookie that must be present after login.
    pub session_cookie: Option<String>,
}

impl FormAuth {
    fn fields(&self, credentials: &Credentials) -> Vec<(String, String)> {
        let mut fields = vec![
            (self.username_field.clone(), credentials.username.clone()),
            (self.password_field.clone(), credentials.password().to_string()),
        ];
        fields.extend(self.extra_fields.iter().cloned());
        fields
    }
}

#[async_trait]
impl AuthStrategy for FormAuth {
    fn id(&self) -> &str {
        "form"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::Form
    }

    #[instrument(skip_all, fields(login_path = %self.login_path))]
    async fn authenticate(
        &self,
        ctx: &FetchContext,
        base: &Url,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), AuthError> {
        let url = join_url(base, &self.login_path)?;
        let request = ctx.http.post(url).form(&self.fields(credentials));
        let response = ctx.http.send(request).await?;
        session.absorb_cookies(&response);

        if let Some(cooldown) = detect_lockout(&response, None, ctx.settings.default_lockout) {
            return Err(AuthError::Lockout { cooldown });
        }
        if response.status == 401 || response.status == 403 {
            return Err(AuthError::WrongCredentials(format!(
                "login returned HTTP {}",
                response.status
            )));
        }

        let page = follow_login_redirects(ctx, response, session).await?;

        if let Some(marker) = &self.error_marker {
            if page.body.contains(marker.as_str()) {
                return Err(AuthError::WrongCredentials(format!("device said {marker:?}")));
            }
        }

        match &self.success_marker {
            Some(marker) if page.body.contains(marker.as_str()) => {}
            Some(_) if page.looks_like_login_form() => {
                return Err(AuthError::WrongCredentials(
                    "device returned the login form".to_string(),
                ));
            }
            Some(marker) => {
                return Err(AuthError::MalformedResponse(format!(
                    "neither success marker {marker:?} nor login form in response"
                )));
            }
            None if page.looks_like_login_form() => {
                return Err(AuthError::WrongCredentials(
                    "device returned the login form".to_string(),
                ));
            }
            None if !page.is_success() => {
                return Err(AuthError::MalformedResponse(format!(
                    "login landed on HTTP {}",
                    page.status
                )));
            }
            None => {}
        }

        if let Some(name) = &self.session_cookie {
            if session.cookie(name).is_none() {
                warn!(cookie = %name, "Login accepted but session cookie missing");
                return Err(AuthError::MalformedResponse(format!(
                    "session cookie {name} was not set"
                )));
            }
        }

        debug!("Form login succeeded");
        Ok(())
    }
}
