//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`PROVIDER__CLIENT_ID`, `SESSION__ENCRYPTION_KEY`).
//!
//! See [`ProviderConfig`] for the identity provider settings.

use axum_extra::extract::cookie::SameSite;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use passage_auth::{ProviderConfig, SessionCipher};
use serde::Deserialize;
use std::fmt;

use crate::error::ServerError;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    #[default]
    Production,
}

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Base URL of the application frontend that login redirects land on.
    pub frontend_url: String,

    #[serde(default)]
    pub environment: Environment,

    /// PostgreSQL connection URL. Users are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Identity provider configuration.
    pub provider: ProviderConfig,

    /// Session cookie configuration.
    pub session: SessionConfig,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Session cookie configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Base64 or base64url encoded 32-byte AES-256-GCM key.
    pub encryption_key: String,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default)]
    pub cookie_domain: Option<String>,

    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Cookie lifetime in seconds.
    #[serde(default = "default_lifetime_seconds")]
    pub lifetime_seconds: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_true")]
    pub secure: bool,

    #[serde(default = "default_true")]
    pub http_only: bool,

    #[serde(default)]
    pub same_site: SameSitePolicy,
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_lifetime_seconds() -> i64 {
    86_400
}

fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// Creates a session configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(encryption_key: String) -> Self {
        Self {
            encryption_key,
            cookie_name: default_cookie_name(),
            cookie_domain: None,
            cookie_path: default_cookie_path(),
            lifetime_seconds: default_lifetime_seconds(),
            secure: default_true(),
            http_only: default_true(),
            same_site: SameSitePolicy::default(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("encryption_key", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_path", &self.cookie_path)
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .finish()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(
            config::Config::builder().add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            ),
        )
    }

    /// Builds and deserializes configuration from prepared sources.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Rejects configurations that are unsafe or unusable.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Configuration` if mock authentication is
    /// enabled in production, the encryption key is not a 32-byte key, or
    /// the session lifetime is not positive.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.provider.mock_auth() && self.environment == Environment::Production {
            return Err(ServerError::configuration(
                "provider.mock_auth must not be enabled in production",
            ));
        }

        SessionCipher::from_encoded_key(&self.session.encryption_key)
            .map_err(|report| ServerError::configuration(report.current_context().to_string()))?;

        if self.session.lifetime_seconds <= 0 {
            return Err(ServerError::configuration(
                "session.lifetime_seconds must be positive",
            ));
        }

        Ok(())
    }

    /// Returns the frontend base URL without a trailing slash.
    #[must_use]
    pub fn frontend_base(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }
}
