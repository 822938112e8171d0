//! Users, registration tokens and the registration transaction.

use super::{decode, encode, is_unique_violation};
use crate::error::{LabError, Result};
use crate::providers::{RegisterTokenRepository, RegistrationStore, UserRepository};
use crate::registration::{normalize_email, RegisterToken, User};
use crate::types::{RegisterTokenId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::JsonValue;
use sqlx::PgPool;

/// `PostgreSQL` accounts store.
#[derive(Clone)]
pub struct PostgresAccounts {
    pool: PgPool,
}

impl PostgresAccounts {
    /// Create a store on `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn email_taken(email: &str) -> LabError {
    LabError::Validation(format!("Email {email} is already registered"))
}

#[async_trait]
impl UserRepository for PostgresAccounts {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let operation = format!("load user {id}");
        let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        row.map(|(json,)| decode(json, &operation)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let operation = "look up user by email";
        let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LabError::storage(operation, e))?;

        row.map(|(json,)| decode(json, operation)).transpose()
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let operation = format!("insert user {}", user.id);
        let data = encode(user, &operation)?;

        sqlx::query("INSERT INTO users (id, email, data) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(normalize_email(&user.email))
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    email_taken(&user.email)
                } else {
                    LabError::storage(&operation, e)
                }
            })?;
        Ok(())
    }
}

#[async_trait]
impl RegisterTokenRepository for PostgresAccounts {
    async fn insert(&self, token: &RegisterToken) -> Result<()> {
        let operation = format!("insert register token {}", token.id);
        let data = encode(token, &operation)?;

        sqlx::query("INSERT INTO register_tokens (id, data) VALUES ($1, $2)")
            .bind(token.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;
        Ok(())
    }

    async fn get(&self, id: RegisterTokenId) -> Result<Option<RegisterToken>> {
        let operation = format!("load register token {id}");
        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM register_tokens WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;

        row.map(|(json,)| decode(json, &operation)).transpose()
    }

    async fn update(&self, token: &RegisterToken) -> Result<()> {
        let operation = format!("update register token {}", token.id);
        let data = encode(token, &operation)?;

        let result = sqlx::query("UPDATE register_tokens SET data = $2 WHERE id = $1")
            .bind(token.id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        if result.rows_affected() == 0 {
            return Err(LabError::not_found("Register token", token.id));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for PostgresAccounts {
    /// `BEGIN`, lock the token row, insert the user, consume the token,
    /// `COMMIT`. Returning early drops the transaction, which rolls it back.
    async fn redeem(&self, token_id: RegisterTokenId, user: &User, now: DateTime<Utc>) -> Result<()> {
        let operation = format!("register user with token {token_id}");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM register_tokens WHERE id = $1 FOR UPDATE")
                .bind(token_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;

        let mut token: RegisterToken = row
            .map(|(json,)| decode(json, &operation))
            .transpose()?
            .ok_or_else(|| LabError::not_found("Register token", token_id))?;
        if !token.is_available() {
            return Err(LabError::TokenUnavailable);
        }

        sqlx::query("INSERT INTO users (id, email, data) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(normalize_email(&user.email))
            .bind(encode(user, &operation)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    email_taken(&user.email)
                } else {
                    LabError::storage(&operation, e)
                }
            })?;

        token.consume(user.id, now);
        sqlx::query("UPDATE register_tokens SET data = $2 WHERE id = $1")
            .bind(token_id.as_uuid())
            .bind(encode(&token, &operation)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        tx.commit()
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        tracing::debug!(%token_id, user_id = %user.id, "Register token consumed");
        Ok(())
    }
}
