//! Per-request identity resolution.
//!
//! Every request ends up with exactly one [`RequestIdentity`]. Failures on
//! the way there are logged and degrade to `Anonymous`; nothing here ever
//! produces an error for the caller.

use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::error::AuthError;
use crate::token::{RequestCredentials, TokenManager};
use crate::user::{User, UserRepository};

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdentity {
    /// Credentials were verified and matched a local user.
    Authenticated(User),
    /// No usable credentials.
    Anonymous,
}

impl RequestIdentity {
    /// Returns the authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Resolves inbound request credentials to a [`RequestIdentity`].
#[derive(Clone)]
pub struct SessionAuthenticator {
    tokens: TokenManager,
    users: Arc<dyn UserRepository>,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(tokens: TokenManager, users: Arc<dyn UserRepository>) -> Self {
        Self { tokens, users }
    }

    /// Returns the identity behind a request's credentials.
    ///
    /// A request without credentials resolves to `Anonymous` without any
    /// Provider call.
    #[instrument(skip_all)]
    pub async fn identify(&self, request: RequestCredentials<'_>) -> RequestIdentity {
        match self.try_identify(request).await {
            Ok(identity) => identity,
            Err(report) => {
                log_rejection(report.current_context());
                RequestIdentity::Anonymous
            }
        }
    }

    async fn try_identify(
        &self,
        request: RequestCredentials<'_>,
    ) -> Result<RequestIdentity, Report<AuthError>> {
        let Some(tokens) = self.tokens.extract_tokens_from_request(request)? else {
            return Ok(RequestIdentity::Anonymous);
        };

        let claims = self.tokens.resolve_identity(&tokens).await?;

        match self.users.find_by_email(claims.email()).await? {
            Some(user) => Ok(RequestIdentity::Authenticated(user)),
            None => {
                debug!("verified identity has no local user");
                Ok(RequestIdentity::Anonymous)
            }
        }
    }
}

fn log_rejection(error: &AuthError) {
    match error {
        AuthError::Decryption => debug!("session cookie rejected"),
        AuthError::InvalidToken { reason } => debug!(%reason, "access token rejected"),
        AuthError::MissingEmail => debug!("identity source returned no email"),
        AuthError::Provider { reason } => warn!(%reason, "provider call failed during request"),
        AuthError::UserLookup { reason } => warn!(%reason, "user lookup failed during request"),
        AuthError::Configuration { reason } => error!(%reason, "auth misconfigured"),
    }
}
