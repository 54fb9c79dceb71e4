//! Error types for the auth crate.
//!
//! Every failure on the authentication path is one of the `AuthError`
//! variants. Operations return them wrapped in a rootcause `Report`; the
//! session layer and the login handler match on `current_context()` and
//! turn each variant into an anonymous identity or an error redirect.
//!
//! Messages never carry secret material (tokens, cookie values, keys).

use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The Provider answered with a non-success status, an unusable body,
    /// or could not be reached.
    Provider { reason: String },
    /// A token failed signature, algorithm, expiry, or audience checks, or
    /// its signing key could not be resolved.
    InvalidToken { reason: String },
    /// A session cookie could not be decrypted.
    ///
    /// Carries no detail: a wrong key, a truncated value and a tampered
    /// value are indistinguishable to the caller.
    Decryption,
    /// The identity source did not yield an email address.
    MissingEmail,
    /// The local user store failed.
    UserLookup { reason: String },
    /// Configuration is missing or invalid.
    Configuration { reason: String },
}

impl AuthError {
    /// Creates a Provider error.
    pub fn provider(reason: impl Into<String>) -> Self {
        Self::Provider {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-token error.
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Creates a user-lookup error.
    pub fn user_lookup(reason: impl Into<String>) -> Self {
        Self::UserLookup {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Short, stable name of the variant for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "provider",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Decryption => "decryption",
            Self::MissingEmail => "missing_email",
            Self::UserLookup { .. } => "user_lookup",
            Self::Configuration { .. } => "configuration",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { reason } => {
                write!(f, "identity provider error: {reason}")
            }
            Self::InvalidToken { reason } => {
                write!(f, "invalid token: {reason}")
            }
            Self::Decryption => {
                write!(f, "session could not be decrypted")
            }
            Self::MissingEmail => {
                write!(f, "identity does not include an email address")
            }
            Self::UserLookup { reason } => {
                write!(f, "user lookup failed: {reason}")
            }
            Self::Configuration { reason } => {
                write!(f, "invalid auth configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = AuthError::provider("token endpoint returned 500");
        assert!(err.to_string().contains("identity provider"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn invalid_token_display() {
        let err = AuthError::invalid_token("ExpiredSignature");
        assert!(err.to_string().contains("invalid token"));
        assert!(err.to_string().contains("ExpiredSignature"));
    }

    #[test]
    fn decryption_error_is_uniform() {
        assert_eq!(
            AuthError::Decryption.to_string(),
            "session could not be decrypted"
        );
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            AuthError::provider("x").kind(),
            AuthError::invalid_token("x").kind(),
            AuthError::Decryption.kind(),
            AuthError::MissingEmail.kind(),
            AuthError::user_lookup("x").kind(),
            AuthError::configuration("x").kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
