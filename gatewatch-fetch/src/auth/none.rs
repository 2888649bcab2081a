//! Devices that serve status pages without logging in.

use async_trait::async_trait;
use url::Url;

use super::{AuthKind, AuthStrategy};
use crate::context::FetchContext;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::session::Session;

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthStrategy for NoAuth {
    fn id(&self) -> &str {
        "none"
    }

    fn kind(&self) -> AuthKind {
        AuthKind::None
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
}
