//! HTTP handlers.
//!
//! Handlers are thin: extract the [`Principal`], check its role, call one
//! service operation, and convert [`LabError`] into [`AppError`].
//!
//! | `LabError`                         | Status |
//! |------------------------------------|--------|
//! | business rejection                 | 400    |
//! | `Forbidden`                        | 403    |
//! | `NotFound`                         | 404    |
//! | `Conflict`                         | 409    |
//! | `Storage`                          | 500    |

pub mod availability;
pub mod conversations;
pub mod registration;
pub mod requests;
pub mod stock;
pub mod websocket;

use crate::error::LabError;
use crate::types::{Role, UserId};
use labdesk_web::{AppError, Principal};

/// Result type of every handler.
pub type ApiResult<T> = Result<T, AppError>;

/// Roles that manage requests and stock.
pub const STAFF_ROLES: &[&str] = &[Role::Admin.as_str(), Role::Staff.as_str()];

/// Roles that manage accounts.
pub const ADMIN_ROLES: &[&str] = &[Role::Admin.as_str()];

impl From<LabError> for AppError {
    fn from(err: LabError) -> Self {
        if err.is_infrastructure() {
            // The cause stays in the log; clients get a generic message.
            return Self::internal("An internal error occurred").with_source(err.into());
        }

        match err {
            LabError::NotFound { resource, id } => Self::not_found(resource, id),
            LabError::Forbidden(message) => Self::forbidden(message),
            conflict @ LabError::Conflict { .. } => Self::conflict(conflict.to_string()),
            other => Self::bad_request(other.to_string()),
        }
    }
}

/// The caller as a [`UserId`].
#[must_use]
pub fn caller(principal: &Principal) -> UserId {
    UserId::from_uuid(principal.user_id)
}

/// Whether the caller manages requests.
#[must_use]
pub fn is_staff(principal: &Principal) -> bool {
    principal.has_any_role(STAFF_ROLES)
}
