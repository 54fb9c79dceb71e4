//! PostgreSQL user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passage_auth::{AuthError, User, UserRepository, normalize_email};
use passage_core::{Result, UserId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> std::result::Result<User, AuthError> {
        let id = UserId::from_str(&self.id).map_err(|e| {
            AuthError::user_lookup(format!("invalid user id '{}': {}", self.id, e))
        })?;
        Ok(User::with_all_fields(
            id,
            self.email,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Repository for users stored in PostgreSQL.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lookup_error(e: sqlx::Error) -> AuthError {
    AuthError::user_lookup(e.to_string())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(lookup_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_user()?)),
            None => Ok(None),
        }
    }

    /// Inserts the user. An existing row for the same email is left in place
    /// and reported as a user lookup error, so `find_or_create` falls back to
    /// the stored row.
    async fn create(&self, user: &User) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.email())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(lookup_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::user_lookup(format!(
                "user with email {} already exists",
                user.email()
            ))
            .into());
        }

        Ok(())
    }
}
