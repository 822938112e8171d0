//! Error taxonomy for lab resource operations.

use crate::types::StockKind;
use thiserror::Error;

/// Result type alias for labdesk operations.
pub type Result<T> = std::result::Result<T, LabError>;

/// Every way a labdesk operation can fail.
///
/// Variants fall in three groups: business rejections (the caller can fix the
/// input), not-found, and infrastructure failures. Nothing in the crate
/// retries; a failed operation fails once and the caller decides.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LabError {
    // ═══════════════════════════════════════════════════════════
    // Business rejections
    // ═══════════════════════════════════════════════════════════

    /// The request names no equipment, material or reactive.
    #[error("Request must include at least one equipment, material or reactive")]
    EmptyRequest,

    /// A line group cannot be satisfied from current stock.
    #[error("{kind} unavailable")]
    Unavailable {
        /// First kind (in check order) that could not be satisfied
        kind: StockKind,
    },

    /// The request is not in a state that allows this transition.
    #[error("Cannot {action} a request that is {status}")]
    InvalidTransition {
        /// Current status, lower-case
        status: String,
        /// Attempted transition
        action: &'static str,
    },

    /// The registration token was already consumed or revoked.
    #[error("Register token is no longer available")]
    TokenUnavailable,

    /// The registration token is bound to a different email address.
    #[error("Register token is not applicable to {email}")]
    TokenNotApplicable {
        /// Email the caller tried to register with
        email: String,
    },

    /// Input failed a domain validation rule.
    #[error("{0}")]
    Validation(String),

    /// The caller's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    // ═══════════════════════════════════════════════════════════
    // Not found
    // ═══════════════════════════════════════════════════════════

    /// The addressed record does not exist (or is soft-deleted).
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Resource name ("Request", "Equipment", ...)
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Concurrency
    // ═══════════════════════════════════════════════════════════

    /// Another writer saved the record between this operation's load and
    /// its save. Nothing was written; the caller may reload and retry.
    #[error("{resource} {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        /// Resource name
        resource: &'static str,
        /// Identifier of the contended record
        id: String,
        /// Version the writer loaded
        expected: i64,
        /// Version found at save time
        actual: i64,
    },

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// Persistence read/write or transaction failure.
    #[error("Failed to {operation}: {cause}")]
    Storage {
        /// What was being done, including the target id when there is one
        operation: String,
        /// Underlying error text
        cause: String,
    },
}

impl LabError {
    /// Build a not-found error.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Wrap an infrastructure error with the operation it interrupted.
    pub fn storage(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Build a version conflict error.
    pub fn conflict(resource: &'static str, id: impl ToString, expected: i64, actual: i64) -> Self {
        Self::Conflict {
            resource,
            id: id.to_string(),
            expected,
            actual,
        }
    }

    /// Returns `true` for business rejections the caller can act on.
    ///
    /// # Examples
    ///
    /// ```
    /// # use labdesk::error::LabError;
    /// assert!(LabError::EmptyRequest.is_client_error());
    /// assert!(!LabError::storage("load request", "timeout").is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Storage { .. } | Self::NotFound { .. } | Self::Conflict { .. }
        )
    }

    /// Returns `true` when a concurrent writer won the race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` when the addressed record does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for infrastructure failures.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
