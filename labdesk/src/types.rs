//! Shared value types: identifiers, roles, stock kinds and the soft-delete marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing `Uuid`
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a user account
    UserId
);
uuid_id!(
    /// Unique identifier for an equipment, material or reactive record
    StockItemId
);
uuid_id!(
    /// Unique identifier for a lab request
    RequestId
);
uuid_id!(
    /// Unique identifier for a request conversation
    ConversationId
);
uuid_id!(
    /// Unique identifier for a conversation message
    MessageId
);
uuid_id!(
    /// Unique identifier for a one-time registration token
    RegisterTokenId
);

// ============================================================================
// Roles
// ============================================================================

/// Role of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages stock, tokens and every request
    Admin,
    /// Lab staff: reviews, approves and completes requests
    Staff,
    /// Regular lab user: creates requests for sessions
    Member,
}

impl Role {
    /// Lower-case role name as carried in identity headers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Member => "member",
        }
    }

    /// Whether the role handles requests (staff or administrator).
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Stock kinds
// ============================================================================

/// The three requestable resource kinds.
///
/// Declaration order is the order in which the availability checker
/// evaluates request line groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockKind {
    /// Reusable lab equipment (microscopes, burettes, ...)
    Equipment,
    /// Consumable materials (gloves, filter paper, ...)
    Material,
    /// Reactive chemicals
    Reactive,
}

impl StockKind {
    /// Human-readable name, used in rejection messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Equipment => "Equipment",
            Self::Material => "Material",
            Self::Reactive => "Reactive",
        }
    }

    /// Name of the collection (table) holding records of this kind.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Equipment => "equipments",
            Self::Material => "materials",
            Self::Reactive => "reactives",
        }
    }
}

impl fmt::Display for StockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Soft delete
// ============================================================================

/// Logical deletion state of a persisted record.
///
/// Records are never physically removed; deleting one records who did it and
/// when, and the record drops out of "available" queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Deletion {
    /// Live record
    #[default]
    Active,
    /// Soft-deleted record
    Deleted {
        /// User that deleted the record
        by: UserId,
        /// When the record was deleted
        at: DateTime<Utc>,
    },
}

impl Deletion {
    /// Whether the record has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    /// Whether the record is live.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_deleted()
    }
}
