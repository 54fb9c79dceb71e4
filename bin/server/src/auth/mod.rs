//! Authentication module for the passage server.
//!
//! This module provides:
//! - the session middleware that attaches a `RequestIdentity` to every request
//! - extractors for handlers that need the caller's identity
//! - the login callback, logout, and identity query routes
//! - a PostgreSQL-backed user repository

pub mod db;
pub mod middleware;
pub mod routes;

use passage_auth::{
    ProviderClient, SessionAuthenticator, SessionCipher, TokenManager, UserRepository,
    resolver_from_config,
};
use std::sync::Arc;

use crate::config::{ServerConfig, SessionConfig};
use crate::error::ServerError;

pub use middleware::{AuthRejection, CurrentIdentity, RequireUser, identify_request};
pub use routes::{login_callback, logout, me};

/// Shared application state.
pub struct AppState {
    /// Code exchange, identity resolution, and session sealing.
    pub tokens: TokenManager,
    /// Per-request identity resolution.
    pub sessions: SessionAuthenticator,
    /// Local user storage.
    pub users: Arc<dyn UserRepository>,
    /// Session cookie configuration.
    pub session_config: SessionConfig,
    /// Frontend base URL, without a trailing slash.
    pub frontend_url: String,
}

impl AppState {
    /// Builds the long-lived auth services from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the Provider client or the session
    /// cipher cannot be built.
    pub fn from_config(
        config: &ServerConfig,
        users: Arc<dyn UserRepository>,
    ) -> Result<Self, ServerError> {
        let provider = ProviderClient::new(&config.provider)
            .map_err(|report| ServerError::configuration(report.current_context().to_string()))?;
        let cipher = SessionCipher::from_encoded_key(&config.session.encryption_key)
            .map_err(|report| ServerError::configuration(report.current_context().to_string()))?;

        let resolver = resolver_from_config(&config.provider, provider.clone());
        tracing::info!(strategy = resolver.name(), "identity resolution configured");

        let tokens = TokenManager::new(provider, resolver, cipher);
        let sessions = SessionAuthenticator::new(tokens.clone(), users.clone());

        Ok(Self {
            tokens,
            sessions,
            users,
            session_config: config.session.clone(),
            frontend_url: config.frontend_base().to_string(),
        })
    }

    /// Returns an absolute frontend URL for `path`.
    #[must_use]
    pub fn frontend(&self, path: &str) -> String {
        format!("{}{}", self.frontend_url, path)
    }
}
