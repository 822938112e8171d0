//! Token issue, revocation and redemption.

use super::{normalize_email, NewUser, RegisterToken, User};
use crate::config::AdminConfig;
use crate::error::{LabError, Result};
use crate::metrics;
use crate::providers::{RegisterTokenRepository, RegistrationStore, UserRepository};
use crate::types::{Deletion, RegisterTokenId, Role, UserId};
use labdesk_core::environment::Clock;
use std::sync::Arc;

/// Issues registration tokens and turns them into user accounts.
#[derive(Clone)]
pub struct RegistrationService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RegisterTokenRepository>,
    store: Arc<dyn RegistrationStore>,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    /// Create the service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RegisterTokenRepository>,
        store: Arc<dyn RegistrationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            tokens,
            store,
            clock,
        }
    }

    /// Issue a token granting `role`, optionally reserved for `email`.
    ///
    /// # Errors
    ///
    /// - [`LabError::Validation`] when `email` is not an address
    /// - [`LabError::Storage`] on persistence failure
    #[tracing::instrument(skip(self, email), fields(%creator, ?role))]
    pub async fn issue_token(
        &self,
        creator: UserId,
        email: Option<String>,
        role: Role,
    ) -> Result<RegisterToken> {
        let email = email
            .map(|e| validate_email(&e))
            .transpose()?;

        let token = RegisterToken {
            id: RegisterTokenId::new(),
            creator,
            email,
            role,
            created_at: self.clock.now(),
            consumed_at: None,
            user_created: None,
            deletion: Deletion::Active,
        };
        self.tokens.insert(&token).await?;
        tracing::info!(token_id = %token.id, "Register token issued");
        Ok(token)
    }

    /// Fetch a token.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when it does not exist.
    pub async fn get_token(&self, id: RegisterTokenId) -> Result<RegisterToken> {
        self.tokens
            .get(id)
            .await?
            .ok_or_else(|| LabError::not_found("Register token", id))
    }

    /// Revoke an unused token.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`] when it does not exist or is already revoked
    /// - [`LabError::TokenUnavailable`] when it was already consumed
    #[tracing::instrument(skip(self))]
    pub async fn revoke_token(&self, id: RegisterTokenId, by: UserId) -> Result<RegisterToken> {
        let mut token = self.get_token(id).await?;
        if token.deletion.is_deleted() {
            return Err(LabError::not_found("Register token", id));
        }
        if token.consumed_at.is_some() {
            return Err(LabError::TokenUnavailable);
        }

        token.deletion = Deletion::Deleted {
            by,
            at: self.clock.now(),
        };
        self.tokens.update(&token).await?;
        tracing::info!(token_id = %id, %by, "Register token revoked");
        Ok(token)
    }

    /// Create a user account by consuming `token_id`.
    ///
    /// The token checks run first so the common refusals never open a
    /// transaction; the store repeats the availability check atomically.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`] when the token does not exist
    /// - [`LabError::TokenUnavailable`] when it was consumed or revoked
    /// - [`LabError::TokenNotApplicable`] when it is reserved for another email
    /// - [`LabError::Validation`] for a malformed or already registered email
    /// - [`LabError::Storage`] when the transaction fails
    #[tracing::instrument(skip(self, new), fields(%token_id))]
    pub async fn register(&self, token_id: RegisterTokenId, new: NewUser) -> Result<User> {
        let result = self.try_register(token_id, new).await;
        metrics::record_registration(match &result {
            Ok(_) => "registered",
            Err(LabError::NotFound { .. }) => "not_found",
            Err(LabError::TokenUnavailable) => "token_unavailable",
            Err(LabError::TokenNotApplicable { .. }) => "token_not_applicable",
            Err(LabError::Validation(_)) => "invalid",
            Err(_) => "error",
        });
        result
    }

    /// Create the configured administrator unless an account with that
    /// email already exists. Returns the created user.
    ///
    /// # Errors
    ///
    /// Propagates validation and storage failures.
    pub async fn bootstrap_admin(&self, admin: &AdminConfig) -> Result<Option<User>> {
        let Some(email) = admin.email.as_deref() else {
            return Ok(None);
        };
        let email = validate_email(email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::debug!(%email, "Administrator already present");
            return Ok(None);
        }

        let user = User {
            id: UserId::new(),
            email,
            name: admin.name.clone(),
            role: Role::Admin,
            created_at: self.clock.now(),
            deletion: Deletion::Active,
        };
        self.users.insert(&user).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "Administrator created");
        Ok(Some(user))
    }

    async fn try_register(&self, token_id: RegisterTokenId, new: NewUser) -> Result<User> {
        let token = self.get_token(token_id).await?;
        if !token.is_available() {
            tracing::info!(%token_id, "Registration with spent token");
            return Err(LabError::TokenUnavailable);
        }

        let email = validate_email(&new.email)?;
        if !token.applies_to(&email) {
            tracing::warn!(%token_id, %email, "Token reserved for another email");
            return Err(LabError::TokenNotApplicable { email });
        }
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LabError::Validation("Name must not be empty".to_string()));
        }

        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            email,
            name: name.to_string(),
            role: token.role,
            created_at: now,
            deletion: Deletion::Active,
        };
        self.store.redeem(token_id, &user, now).await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }
}

/// Normalise `email` and reject anything that is not `local@domain`.
fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LabError::Validation(format!("{email:?} is not an email address"))),
    }
}
