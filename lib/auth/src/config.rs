//! Identity provider configuration.
//!
//! This module describes how to reach the external Provider (token,
//! userinfo, and key-set endpoints), which client credentials to present,
//! and how identities are established from its tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an identity is established from an access token.
///
/// Chosen once at startup; requests never mix strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Verify the access token locally as a signed JWT.
    #[default]
    Jwt,
    /// Ask the Provider's userinfo endpoint who the token belongs to.
    Userinfo,
}

/// Configuration for the identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Provider (e.g., "https://example.okta.com").
    domain: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// The redirect URI registered for the login callback.
    redirect_uri: String,
    /// Token endpoint path, appended to `domain`.
    #[serde(default = "default_token_path")]
    token_path: String,
    /// Userinfo endpoint path, appended to `domain`.
    #[serde(default = "default_userinfo_path")]
    userinfo_path: String,
    /// Key-set endpoint path, appended to `domain`.
    #[serde(default = "default_jwks_path")]
    jwks_path: String,
    /// Expected `aud` claim of access tokens.
    #[serde(default = "default_audience")]
    audience: String,
    /// Expected `iss` claim of access tokens. Not checked when unset.
    #[serde(default)]
    issuer: Option<String>,
    /// Strategy used to resolve an identity from a token.
    #[serde(default)]
    identity_strategy: IdentityStrategy,
    /// Claim that carries the user's email in a verified JWT.
    #[serde(default = "default_identity_claim")]
    identity_claim: String,
    /// Treat tokens as raw JSON claims without any verification.
    /// Test environments only.
    #[serde(default)]
    mock_auth: bool,
    /// Per-call timeout for Provider requests, in seconds.
    #[serde(default = "default_http_timeout_seconds")]
    http_timeout_seconds: u64,
    /// Allowed clock skew when checking `exp`, in seconds.
    #[serde(default)]
    jwt_leeway_seconds: u64,
    /// Minimum interval between key-set fetches triggered by unknown key ids.
    #[serde(default = "default_jwks_min_refresh_seconds")]
    jwks_min_refresh_seconds: u64,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("identity_strategy", &self.identity_strategy)
            .field("mock_auth", &self.mock_auth)
            .finish_non_exhaustive()
    }
}

fn default_token_path() -> String {
    "/oauth2/default/v1/token".to_string()
}

fn default_userinfo_path() -> String {
    "/oauth2/default/v1/userinfo".to_string()
}

fn default_jwks_path() -> String {
    "/oauth2/default/v1/keys".to_string()
}

fn default_audience() -> String {
    "api://default".to_string()
}

fn default_identity_claim() -> String {
    "sub".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    10
}

fn default_jwks_min_refresh_seconds() -> u64 {
    10
}

impl ProviderConfig {
    /// Creates a new provider configuration with defaults for optional fields.
    #[must_use]
    pub fn new(
        domain: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        ProviderConfigBuilder::new(domain, client_id, client_secret, redirect_uri).build()
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        domain: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(domain, client_id, client_secret, redirect_uri)
    }

    /// Returns the Provider base URL without a trailing slash.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.domain.trim_end_matches('/')
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth2 redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the full token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{}", self.domain(), self.token_path)
    }

    /// Returns the full userinfo endpoint URL.
    #[must_use]
    pub fn userinfo_url(&self) -> String {
        format!("{}{}", self.domain(), self.userinfo_path)
    }

    /// Returns the full key-set endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.domain(), self.jwks_path)
    }

    /// Returns the expected audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Returns the expected issuer, if one is configured.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Returns the identity strategy.
    #[must_use]
    pub fn identity_strategy(&self) -> IdentityStrategy {
        self.identity_strategy
    }

    /// Returns the claim that carries the user's email.
    #[must_use]
    pub fn identity_claim(&self) -> &str {
        &self.identity_claim
    }

    /// Returns true if token verification is replaced by raw claim parsing.
    #[must_use]
    pub fn mock_auth(&self) -> bool {
        self.mock_auth
    }

    /// Returns the Provider request timeout.
    #[must_use]
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_seconds)
    }

    /// Returns the allowed clock skew for `exp` checks, in seconds.
    #[must_use]
    pub fn jwt_leeway_seconds(&self) -> u64 {
        self.jwt_leeway_seconds
    }

    /// Returns the minimum interval between miss-triggered key-set fetches.
    #[must_use]
    pub fn jwks_min_refresh(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.jwks_min_refresh_seconds)
    }
}

/// Builder for `ProviderConfig`.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        domain: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            config: ProviderConfig {
                domain,
                client_id,
                client_secret,
                redirect_uri,
                token_path: default_token_path(),
                userinfo_path: default_userinfo_path(),
                jwks_path: default_jwks_path(),
                audience: default_audience(),
                issuer: None,
                identity_strategy: IdentityStrategy::default(),
                identity_claim: default_identity_claim(),
                mock_auth: false,
                http_timeout_seconds: default_http_timeout_seconds(),
                jwt_leeway_seconds: 0,
                jwks_min_refresh_seconds: default_jwks_min_refresh_seconds(),
            },
        }
    }

    /// Sets the token endpoint path.
    #[must_use]
    pub fn token_path(mut self, path: String) -> Self {
        self.config.token_path = path;
        self
    }

    /// Sets the userinfo endpoint path.
    #[must_use]
    pub fn userinfo_path(mut self, path: String) -> Self {
        self.config.userinfo_path = path;
        self
    }

    /// Sets the key-set endpoint path.
    #[must_use]
    pub fn jwks_path(mut self, path: String) -> Self {
        self.config.jwks_path = path;
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn audience(mut self, audience: String) -> Self {
        self.config.audience = audience;
        self
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn issuer(mut self, issuer: String) -> Self {
        self.config.issuer = Some(issuer);
        self
    }

    /// Sets the identity strategy.
    #[must_use]
    pub fn identity_strategy(mut self, strategy: IdentityStrategy) -> Self {
        self.config.identity_strategy = strategy;
        self
    }

    /// Sets the claim that carries the user's email.
    #[must_use]
    pub fn identity_claim(mut self, claim: String) -> Self {
        self.config.identity_claim = claim;
        self
    }

    /// Enables or disables mock token parsing.
    #[must_use]
    pub fn mock_auth(mut self, enabled: bool) -> Self {
        self.config.mock_auth = enabled;
        self
    }

    /// Sets the Provider request timeout in seconds.
    #[must_use]
    pub fn http_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.http_timeout_seconds = seconds;
        self
    }

    /// Sets the allowed clock skew for `exp` checks.
    #[must_use]
    pub fn jwt_leeway_seconds(mut self, seconds: u64) -> Self {
        self.config.jwt_leeway_seconds = seconds;
        self
    }

    /// Sets the minimum interval between miss-triggered key-set fetches.
    #[must_use]
    pub fn jwks_min_refresh_seconds(mut self, seconds: u64) -> Self {
        self.config.jwks_min_refresh_seconds = seconds;
        self
    }

    /// Builds the `ProviderConfig`.
    #[must_use]
    pub fn build(self) -> ProviderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProviderConfig {
        ProviderConfig::new(
            "https://example.okta.com/".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/login-callback".to_string(),
        )
    }

    #[test]
    fn new_config_has_defaults() {
        let config = sample();

        assert_eq!(config.domain(), "https://example.okta.com");
        assert_eq!(
            config.token_url(),
            "https://example.okta.com/oauth2/default/v1/token"
        );
        assert_eq!(
            config.userinfo_url(),
            "https://example.okta.com/oauth2/default/v1/userinfo"
        );
        assert_eq!(
            config.jwks_url(),
            "https://example.okta.com/oauth2/default/v1/keys"
        );
        assert_eq!(config.audience(), "api://default");
        assert_eq!(config.issuer(), None);
        assert_eq!(config.identity_strategy(), IdentityStrategy::Jwt);
        assert_eq!(config.identity_claim(), "sub");
        assert!(!config.mock_auth());
        assert_eq!(config.http_timeout().as_secs(), 10);
    }

    #[test]
    fn builder_allows_customization() {
        let config = ProviderConfig::builder(
            "https://idp.example.com".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/login-callback".to_string(),
        )
        .token_path("/token".to_string())
        .userinfo_path("/userinfo".to_string())
        .jwks_path("/keys".to_string())
        .issuer("https://idp.example.com".to_string())
        .identity_strategy(IdentityStrategy::Userinfo)
        .identity_claim("email".to_string())
        .build();

        assert_eq!(config.token_url(), "https://idp.example.com/token");
        assert_eq!(config.userinfo_url(), "https://idp.example.com/userinfo");
        assert_eq!(config.jwks_url(), "https://idp.example.com/keys");
        assert_eq!(config.issuer(), Some("https://idp.example.com"));
        assert_eq!(config.identity_strategy(), IdentityStrategy::Userinfo);
        assert_eq!(config.identity_claim(), "email");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "domain": "https://example.okta.com",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://app.example.com/login-callback"
        }"#;

        let config: ProviderConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.client_id(), "my-client");
        assert_eq!(config.identity_strategy(), IdentityStrategy::Jwt);
        assert!(!config.mock_auth());
        assert_eq!(config.jwt_leeway_seconds(), 0);
        assert_eq!(config.jwks_min_refresh().as_secs(), 10);
    }

    #[test]
    fn identity_strategy_parses_snake_case() {
        let json = r#"{
            "domain": "https://example.okta.com",
            "client_id": "my-client",
            "client_secret": "secret",
            "redirect_uri": "https://app.example.com/login-callback",
            "identity_strategy": "userinfo",
            "mock_auth": true
        }"#;

        let config: ProviderConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.identity_strategy(), IdentityStrategy::Userinfo);
        assert!(config.mock_auth());
    }
}
