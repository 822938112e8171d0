//! User accounts and one-time registration tokens.

use crate::types::{Deletion, RegisterTokenId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: UserId,
    /// Login email, stored lower-cased
    pub email: String,
    /// Display name
    pub name: String,
    /// Role granted at registration
    pub role: Role,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Soft-delete state
    #[serde(default)]
    pub deletion: Deletion,
}

/// One-time invitation credential.
///
/// Issued by an administrator, optionally bound to one email address, and
/// consumed exactly once by the registration it enables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterToken {
    /// Token id (the secret handed to the invitee)
    pub id: RegisterTokenId,
    /// Administrator who issued it
    pub creator: UserId,
    /// Email the token is reserved for, if any
    #[serde(default)]
    pub email: Option<String>,
    /// Role the registered user receives
    pub role: Role,
    /// Issue time
    pub created_at: DateTime<Utc>,
    /// When it was consumed
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
    /// User created with it
    #[serde(default)]
    pub user_created: Option<UserId>,
    /// Soft-delete (revocation) state
    #[serde(default)]
    pub deletion: Deletion,
}

impl RegisterToken {
    /// Not consumed and not revoked.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.consumed_at.is_none() && self.deletion.is_active()
    }

    /// Whether someone registering as `email` may use this token.
    #[must_use]
    pub fn applies_to(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_none_or(|bound| bound.eq_ignore_ascii_case(email.trim()))
    }

    /// Record consumption by `user`.
    pub fn consume(&mut self, user: UserId, now: DateTime<Utc>) {
        self.consumed_at = Some(now);
        self.user_created = Some(user);
    }
}

/// Registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
}

/// Normalise an email address for storage and comparison.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
