//! Identity resolution strategies.
//!
//! An access token is turned into an email either by verifying it locally
//! as a JWT or by asking the Provider's userinfo endpoint about it. One
//! strategy is chosen at startup and used for every request.

use async_trait::async_trait;
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::config::{IdentityStrategy, ProviderConfig};
use crate::error::AuthError;
use crate::provider::ProviderClient;
use crate::user::normalize_email;
use crate::verifier::SignatureVerifier;

/// Claim consulted when the configured identity claim is absent.
const EMAIL_CLAIM: &str = "email";

/// The identity established for a set of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    email: String,
}

impl IdentityClaims {
    /// Creates identity claims from a raw email value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingEmail` if the value is blank.
    pub fn from_email(raw: &str) -> Result<Self, AuthError> {
        let email = normalize_email(raw);
        if email.is_empty() {
            return Err(AuthError::MissingEmail);
        }
        Ok(Self { email })
    }

    /// Returns the normalized (trimmed, lower-cased) email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// A way of establishing who an access token belongs to.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resolves the identity behind an access token.
    async fn resolve(&self, access_token: &str) -> Result<IdentityClaims, Report<AuthError>>;
}

/// Builds the resolver selected by `identity_strategy`.
pub fn resolver_from_config(
    config: &ProviderConfig,
    provider: ProviderClient,
) -> Arc<dyn IdentityResolver> {
    match config.identity_strategy() {
        IdentityStrategy::Jwt => Arc::new(JwtIdentityResolver::new(
            SignatureVerifier::from_config(config, provider),
            config.identity_claim().to_string(),
        )),
        IdentityStrategy::Userinfo => Arc::new(UserinfoIdentityResolver::new(provider)),
    }
}

/// Reads the identity from the claims of a locally verified JWT.
pub struct JwtIdentityResolver {
    verifier: SignatureVerifier,
    claim: String,
}

impl JwtIdentityResolver {
    /// Creates a resolver reading `claim`, falling back to `email`.
    #[must_use]
    pub fn new(verifier: SignatureVerifier, claim: String) -> Self {
        Self { verifier, claim }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    fn name(&self) -> &'static str {
        "jwt"
    }

    async fn resolve(&self, access_token: &str) -> Result<IdentityClaims, Report<AuthError>> {
        let claims = self.verifier.verify(access_token).await?;

        let email = [self.claim.as_str(), EMAIL_CLAIM]
            .into_iter()
            .filter_map(|name| claims.get(name).and_then(JsonValue::as_str))
            .find(|value| !value.trim().is_empty())
            .ok_or(AuthError::MissingEmail)?;

        debug!(claim = %self.claim, "identity read from verified token");
        Ok(IdentityClaims::from_email(email)?)
    }
}

/// Asks the Provider's userinfo endpoint who the token belongs to.
pub struct UserinfoIdentityResolver {
    provider: ProviderClient,
}

impl UserinfoIdentityResolver {
    /// Creates a userinfo-backed resolver.
    #[must_use]
    pub fn new(provider: ProviderClient) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl IdentityResolver for UserinfoIdentityResolver {
    fn name(&self) -> &'static str {
        "userinfo"
    }

    async fn resolve(&self, access_token: &str) -> Result<IdentityClaims, Report<AuthError>> {
        let body = self.provider.userinfo(access_token).await?;
        let email = body
            .get(EMAIL_CLAIM)
            .and_then(JsonValue::as_str)
            .ok_or(AuthError::MissingEmail)?;
        Ok(IdentityClaims::from_email(email)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(uri: String, strategy: IdentityStrategy, mock_auth: bool) -> ProviderConfig {
        ProviderConfig::builder(
            uri,
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/login-callback".to_string(),
        )
        .identity_strategy(strategy)
        .mock_auth(mock_auth)
        .build()
    }

    fn mock_jwt_resolver() -> Arc<dyn IdentityResolver> {
        let config = config_for("http://127.0.0.1:9".to_string(), IdentityStrategy::Jwt, true);
        let provider = ProviderClient::new(&config).expect("client");
        resolver_from_config(&config, provider)
    }

    async fn userinfo_resolver(body: JsonValue, status: u16) -> (MockServer, Arc<dyn IdentityResolver>) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/default/v1/userinfo"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        let config = config_for(server.uri(), IdentityStrategy::Userinfo, false);
        let provider = ProviderClient::new(&config).expect("client");
        (server, resolver_from_config(&config, provider))
    }

    #[test]
    fn email_is_normalized() {
        let claims = IdentityClaims::from_email("  User@Example.COM ").expect("email");
        assert_eq!(claims.email(), "user@example.com");
    }

    #[test]
    fn blank_email_is_missing() {
        assert_eq!(IdentityClaims::from_email("   "), Err(AuthError::MissingEmail));
    }

    #[test]
    fn strategy_selects_resolver() {
        assert_eq!(mock_jwt_resolver().name(), "jwt");

        let config = config_for(
            "http://127.0.0.1:9".to_string(),
            IdentityStrategy::Userinfo,
            false,
        );
        let provider = ProviderClient::new(&config).expect("client");
        assert_eq!(resolver_from_config(&config, provider).name(), "userinfo");
    }

    #[tokio::test]
    async fn jwt_resolver_reads_subject() {
        let claims = mock_jwt_resolver()
            .resolve(r#"{"sub":"User@Example.com"}"#)
            .await
            .expect("identity");
        assert_eq!(claims.email(), "user@example.com");
    }

    #[tokio::test]
    async fn jwt_resolver_falls_back_to_email_claim() {
        let claims = mock_jwt_resolver()
            .resolve(r#"{"sub":"","email":"user@example.com"}"#)
            .await
            .expect("identity");
        assert_eq!(claims.email(), "user@example.com");
    }

    #[tokio::test]
    async fn jwt_resolver_without_identity_claim_fails() {
        let err = mock_jwt_resolver()
            .resolve(r#"{"scope":"openid"}"#)
            .await
            .expect_err("must fail");
        assert_eq!(err.current_context(), &AuthError::MissingEmail);
    }

    #[tokio::test]
    async fn userinfo_resolver_reads_email() {
        let (_server, resolver) =
            userinfo_resolver(json!({ "email": "user@example.com", "sub": "00u1" }), 200).await;
        let claims = resolver.resolve("tok").await.expect("identity");
        assert_eq!(claims.email(), "user@example.com");
    }

    #[tokio::test]
    async fn userinfo_resolver_requires_email() {
        let (_server, resolver) = userinfo_resolver(json!({ "sub": "00u1" }), 200).await;
        let err = resolver.resolve("tok").await.expect_err("must fail");
        assert_eq!(err.current_context(), &AuthError::MissingEmail);
    }

    #[tokio::test]
    async fn userinfo_resolver_rejects_empty_email() {
        let (_server, resolver) = userinfo_resolver(json!({ "email": "" }), 200).await;
        let err = resolver.resolve("tok").await.expect_err("must fail");
        assert_eq!(err.current_context(), &AuthError::MissingEmail);
    }

    #[tokio::test]
    async fn userinfo_resolver_surfaces_provider_failure() {
        let (_server, resolver) = userinfo_resolver(json!({}), 401).await;
        let err = resolver.resolve("tok").await.expect_err("must fail");
        assert_eq!(err.current_context().kind(), "provider");
    }
}
