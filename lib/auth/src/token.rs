//! Token pairs, cookie credentials, and the token manager.
//!
//! The token manager ties together code exchange, identity resolution,
//! and the two credential carriers a request may use: the encrypted
//! session cookie and the `Authorization: Bearer` header.

use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

use crate::crypto::SessionCipher;
use crate::error::AuthError;
use crate::identity::{IdentityClaims, IdentityResolver};
use crate::provider::ProviderClient;

/// Tokens issued by the Provider for one login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    access_token: String,
    refresh_token: Option<String>,
}

impl TokenPair {
    /// Creates a token pair.
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    /// Creates a token pair from a bearer credential, which never carries
    /// a refresh token.
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self::new(access_token, None)
    }

    /// Returns the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the refresh token, if the Provider issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Serialized form of a token pair stored inside the session cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl From<&TokenPair> for Credentials {
    fn from(tokens: &TokenPair) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }
}

impl From<Credentials> for TokenPair {
    fn from(credentials: Credentials) -> Self {
        Self::new(credentials.access_token, credentials.refresh_token)
    }
}

/// The raw credential carriers found on an inbound request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCredentials<'a> {
    /// Value of the session cookie, if present.
    pub session_cookie: Option<&'a str>,
    /// Value of the `Authorization` header, if present.
    pub authorization: Option<&'a str>,
}

/// Orchestrates token acquisition, session sealing, and identity resolution.
///
/// Built once at startup and shared by every request.
#[derive(Clone)]
pub struct TokenManager {
    provider: ProviderClient,
    resolver: Arc<dyn IdentityResolver>,
    cipher: SessionCipher,
}

impl TokenManager {
    /// Creates a token manager.
    #[must_use]
    pub fn new(
        provider: ProviderClient,
        resolver: Arc<dyn IdentityResolver>,
        cipher: SessionCipher,
    ) -> Self {
        Self {
            provider,
            resolver,
            cipher,
        }
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns a Provider error if the token endpoint rejects the code or
    /// answers without an access token.
    pub async fn exchange_code_for_tokens(
        &self,
        code: &str,
    ) -> Result<TokenPair, Report<AuthError>> {
        self.provider.exchange_code(code).await
    }

    /// Establishes who the tokens belong to, using the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns whichever error the strategy hit; never an empty identity.
    #[instrument(skip_all, fields(strategy = self.resolver.name()))]
    pub async fn resolve_identity(
        &self,
        tokens: &TokenPair,
    ) -> Result<IdentityClaims, Report<AuthError>> {
        self.resolver.resolve(tokens.access_token()).await
    }

    /// Seals tokens into an encrypted session cookie value.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be serialized or encrypted.
    pub fn seal_session(&self, tokens: &TokenPair) -> Result<String, Report<AuthError>> {
        let json = serde_json::to_string(&Credentials::from(tokens))
            .map_err(|e| AuthError::configuration(format!("credentials not serializable: {e}")))?;
        self.cipher.encrypt(&json)
    }

    /// Opens an encrypted session cookie value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Decryption` if the value does not decrypt, or
    /// decrypts to something that is not a credentials object.
    pub fn open_session(&self, cookie_value: &str) -> Result<TokenPair, Report<AuthError>> {
        let json = self.cipher.decrypt(cookie_value)?;
        let credentials: Credentials =
            serde_json::from_str(&json).map_err(|_| AuthError::Decryption)?;
        Ok(credentials.into())
    }

    /// Finds the caller's tokens on a request.
    ///
    /// The session cookie wins over the `Authorization` header. A request
    /// carrying neither yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Decryption` if a session cookie is present but
    /// cannot be opened.
    pub fn extract_tokens_from_request(
        &self,
        request: RequestCredentials<'_>,
    ) -> Result<Option<TokenPair>, Report<AuthError>> {
        if let Some(cookie) = request.session_cookie {
            return self.open_session(cookie).map(Some);
        }

        Ok(request
            .authorization
            .and_then(bearer_token)
            .map(|token| TokenPair::bearer(token.to_string())))
    }
}

/// Returns the token of a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
