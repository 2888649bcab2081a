//! HTTP Basic authentication.
//!
//! Credentials ride on every request, so there is nothing to establish.
//! A 401 on a data page means the credentials are wrong.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use url::Url;

use super::{AuthKind, AuthStrategy, with_cookies};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::session::Session;

/// HTTP Basic on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuth;

#[async_trait]
impl AuthStrategy for BasicAuth {
    fn id(&self) -> &str {
        "basic"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::Basic
    }

    fn is_stateless(&self) -> bool {
        true
    }

    async fn authenticate(
        &self,
        _ctx: &FetchContext,
        _base: &Url,
        _session: &mut Session,
        _credentials: &Credentials,
    ) -> Result<(), AuthError> {
        Ok(())
    }

    fn decorate(
        &self,
        request: RequestBuilder,
        session: &Session,
        credentials: &Credentials,
    ) -> RequestBuilder {
        with_cookies(request, session)
            .basic_auth(&credentials.username, Some(credentials.password()))
    }
}
