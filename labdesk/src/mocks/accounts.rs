//! In-memory users and registration tokens.
//!
//! Users and tokens share one mutex so that redeeming a token (insert user,
//! consume token) is a single critical section.

use super::{lock, FailureSwitch};
use crate::error::{LabError, Result};
use crate::providers::{RegisterTokenRepository, RegistrationStore, UserRepository};
use crate::registration::{normalize_email, RegisterToken, User};
use crate::types::{RegisterTokenId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Accounts {
    users: HashMap<UserId, User>,
    tokens: HashMap<RegisterTokenId, RegisterToken>,
}

impl Accounts {
    fn email_taken(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.users.values().any(|u| u.email == email)
    }
}

/// Users, tokens and the atomic redeem over one in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    inner: Arc<Mutex<Accounts>>,
    failure: Arc<FailureSwitch>,
}

impl InMemoryAccounts {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `cause`.
    pub fn fail_with(&self, cause: impl Into<String>) {
        self.failure.set(cause);
    }

    /// Stop failing.
    pub fn recover(&self) {
        self.failure.clear();
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .users
            .len()
    }
}

#[async_trait]
impl UserRepository for InMemoryAccounts {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let operation = format!("load user {id}");
        self.failure.check(|| operation.clone())?;
        Ok(lock(&self.inner, &operation)?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let operation = "look up user by email";
        self.failure.check(|| operation.to_string())?;
        let email = normalize_email(email);
        Ok(lock(&self.inner, operation)?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let operation = format!("insert user {}", user.id);
        self.failure.check(|| operation.clone())?;
        let mut accounts = lock(&self.inner, &operation)?;
        if accounts.email_taken(&user.email) {
            return Err(LabError::Validation(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        accounts.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl RegisterTokenRepository for InMemoryAccounts {
    async fn insert(&self, token: &RegisterToken) -> Result<()> {
        let operation = format!("insert register token {}", token.id);
        self.failure.check(|| operation.clone())?;
        lock(&self.inner, &operation)?
            .tokens
            .insert(token.id, token.clone());
        Ok(())
    }

    async fn get(&self, id: RegisterTokenId) -> Result<Option<RegisterToken>> {
        let operation = format!("load register token {id}");
        self.failure.check(|| operation.clone())?;
        Ok(lock(&self.inner, &operation)?.tokens.get(&id).cloned())
    }

    async fn update(&self, token: &RegisterToken) -> Result<()> {
        let operation = format!("update register token {}", token.id);
        self.failure.check(|| operation.clone())?;
        let mut accounts = lock(&self.inner, &operation)?;
        match accounts.tokens.get_mut(&token.id) {
            Some(slot) => {
                *slot = token.clone();
                Ok(())
            }
            None => Err(LabError::not_found("Register token", token.id)),
        }
    }
}

#[async_trait]
impl RegistrationStore for InMemoryAccounts {
    async fn redeem(&self, token: RegisterTokenId, user: &User, now: DateTime<Utc>) -> Result<()> {
        let operation = format!("register user with token {token}");
        self.failure.check(|| operation.clone())?;
        let mut accounts = lock(&self.inner, &operation)?;

        let available = accounts
            .tokens
            .get(&token)
            .map(RegisterToken::is_available)
            .ok_or_else(|| LabError::not_found("Register token", token))?;
        if !available {
            return Err(LabError::TokenUnavailable);
        }
        if accounts.email_taken(&user.email) {
            return Err(LabError::Validation(format!(
                "Email {} is already registered",
                user.email
            )));
        }

        accounts.users.insert(user.id, user.clone());
        if let Some(stored) = accounts.tokens.get_mut(&token) {
            stored.consume(user.id, now);
        }
        Ok(())
    }
}
