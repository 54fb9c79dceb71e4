//! Local user records and the repository that stores them.
//!
//! Users are keyed by lower-cased email. They are created lazily on the
//! first successful login and only looked up afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passage_core::{Result, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::AuthError;

/// A local user of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user for an email seen for the first time.
    #[must_use]
    pub fn new(email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: normalize_email(email),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a user from storage.
    #[must_use]
    pub fn with_all_fields(
        id: UserId,
        email: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Lower-cases and trims an email for use as a lookup key.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Storage for local users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by email. Absence is `Ok(None)`, not an error.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Stores a new user.
    async fn create(&self, user: &User) -> Result<(), AuthError>;

    /// Returns the user for `email`, creating it if none exists.
    ///
    /// If `create` fails because a concurrent login stored the same email
    /// first, the stored user is returned instead.
    async fn find_or_create(&self, email: &str) -> Result<User, AuthError> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }
        let user = User::new(email);
        if let Err(err) = self.create(&user).await {
            if let Some(existing) = self.find_by_email(email).await? {
                tracing::debug!(user_id = %existing.id(), "user was created concurrently");
                return Ok(existing);
            }
            return Err(err);
        }
        tracing::info!(user_id = %user.id(), "created local user");
        Ok(user)
    }
}

/// Process-local user storage, used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }

    async fn create(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if users.contains_key(user.email()) {
            return Err(AuthError::user_lookup(format!("user {} already exists", user.id())).into());
        }
        users.insert(user.email().to_string(), user.clone());
        Ok(())
    }
}
