//! Actions for the request lifecycle reducer.

use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Everything that can happen to an existing request.
///
/// Creation and line edits go through the availability checker and are
/// handled by the service; the reducer only owns status and deletion changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction {
    /// Accept a pending request.
    Approve {
        /// Staff member approving
        by: UserId,
    },

    /// Refuse a pending or approved request.
    Reject {
        /// Staff member rejecting
        by: UserId,
        /// Reason shown to the requester
        reason: Option<String>,
    },

    /// Close an approved request once the session took place.
    Complete {
        /// Staff member completing
        by: UserId,
    },

    /// Hand the request to a staff member.
    Assign {
        /// Staff member taking the request
        staff: UserId,
        /// Who made the assignment
        by: UserId,
    },

    /// Apply the expiration rule.
    ///
    /// A no-op unless the request is live, non-terminal and past its TTL.
    Expire,

    /// Soft-delete the request.
    SoftDelete {
        /// Who deleted it
        by: UserId,
    },
}

impl RequestAction {
    /// Short verb used in transition errors and logs.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::Complete { .. } => "complete",
            Self::Assign { .. } => "assign",
            Self::Expire => "expire",
            Self::SoftDelete { .. } => "delete",
        }
    }

    /// User behind the action, if any (expiration has none).
    #[must_use]
    pub const fn actor(&self) -> Option<UserId> {
        match self {
            Self::Approve { by }
            | Self::Reject { by, .. }
            | Self::Complete { by }
            | Self::Assign { by, .. }
            | Self::SoftDelete { by } => Some(*by),
            Self::Expire => None,
        }
    }
}
