//! Relying-party authentication for passage.
//!
//! This crate turns a Provider authorization code into an encrypted session
//! cookie, and turns a session cookie or bearer header back into a local
//! user on every request.
//!
//! # Components
//!
//! - [`SessionCipher`]: authenticated encryption of cookie values
//! - [`SignatureVerifier`]: JWT verification against the Provider's key set
//! - [`TokenManager`]: code exchange, identity resolution and credential
//!   extraction
//! - [`SessionAuthenticator`]: per-request identity, failing closed to
//!   [`RequestIdentity::Anonymous`]

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod provider;
pub mod session;
pub mod token;
pub mod user;
pub mod verifier;

pub use config::{IdentityStrategy, ProviderConfig, ProviderConfigBuilder};
pub use crypto::SessionCipher;
pub use error::AuthError;
pub use identity::{
    IdentityClaims, IdentityResolver, JwtIdentityResolver, UserinfoIdentityResolver,
    resolver_from_config,
};
pub use provider::ProviderClient;
pub use session::{RequestIdentity, SessionAuthenticator};
pub use token::{Credentials, RequestCredentials, TokenManager, TokenPair};
pub use user::{InMemoryUserRepository, User, UserRepository, normalize_email};
pub use verifier::{Claims, SignatureVerifier};
