//! Domain error types for server startup.
//!
//! Request-path failures never reach this type: the session middleware and
//! the login handler turn them into an anonymous identity or an error
//! redirect. These variants cover what can stop the process.

use std::fmt;

/// Errors that prevent the server from starting or serving.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration is missing, malformed, or unsafe for the environment.
    Configuration { reason: String },
    /// The database could not be reached or migrated.
    Database { details: String },
    /// Binding or serving the listener failed.
    Io { details: String },
}

impl ServerError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn database(details: impl fmt::Display) -> Self {
        Self::Database {
            details: details.to_string(),
        }
    }

    pub fn io(details: impl fmt::Display) -> Self {
        Self::Io {
            details: details.to_string(),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::Io { details } => write!(f, "server I/O error: {details}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = ServerError::configuration("mock_auth is not allowed in production");
        assert_eq!(
            err.to_string(),
            "invalid configuration: mock_auth is not allowed in production"
        );
    }

    #[test]
    fn database_error_display() {
        assert_eq!(
            ServerError::database("connection refused").to_string(),
            "database error: connection refused"
        );
    }
}
