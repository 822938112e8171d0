//! Stock records for the three requestable resource kinds.

use crate::types::{Deletion, StockItemId, StockKind};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Traits
// ============================================================================

/// Kind-specific "is there enough of this?" check.
///
/// Each kind answers differently and the differences are kept on purpose:
///
/// | Kind      | Amount | Enough when                 |
/// |-----------|--------|-----------------------------|
/// | Equipment | `u32`  | `stock - in_repair >= n`    |
/// | Material  | `u32`  | `stock - in_use >= n`       |
/// | Reactive  | `f64`  | `stock >= n`                |
pub trait StockCheckable {
    /// Unit in which requests for this kind are expressed.
    type Amount: Copy + Send + Sync + std::fmt::Debug;

    /// Whether `required` units can currently be handed out.
    fn has_enough_stock_available(&self, required: Self::Amount) -> bool;
}

/// Behaviour shared by every stock record.
pub trait StockItem:
    StockCheckable + Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Which kind this record is.
    const KIND: StockKind;

    /// Client-supplied fields for create and update.
    type Draft: DeserializeOwned + Send + 'static;

    /// Record id.
    fn id(&self) -> StockItemId;

    /// Administrative availability flag.
    fn is_flagged_available(&self) -> bool;

    /// Soft-delete state.
    fn deletion(&self) -> &Deletion;

    /// Mutable soft-delete state.
    fn deletion_mut(&mut self) -> &mut Deletion;

    /// Build a fresh record from a draft.
    fn from_draft(draft: Self::Draft, now: DateTime<Utc>) -> Self;

    /// Overwrite the editable fields with `draft`.
    fn apply_draft(&mut self, draft: Self::Draft, now: DateTime<Utc>);

    /// Stamp the last-modified time.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Not soft-deleted and flagged available.
    fn is_available(&self) -> bool {
        self.deletion().is_active() && self.is_flagged_available()
    }

    /// Listing filter.
    ///
    /// `None` keeps everything (deleted records included), `Some(true)` keeps
    /// available records, `Some(false)` keeps live records flagged unavailable.
    fn matches_filter(&self, available: Option<bool>) -> bool {
        match available {
            None => true,
            Some(true) => self.is_available(),
            Some(false) => self.deletion().is_active() && !self.is_flagged_available(),
        }
    }
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// Equipment
// ============================================================================

/// Reusable lab equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Record id
    pub id: StockItemId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Units owned
    pub stock: u32,
    /// Units out of service
    pub in_repair: u32,
    /// Administrative override
    pub is_available: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete state
    #[serde(default)]
    pub deletion: Deletion,
}

/// Create/update payload for [`Equipment`].
#[derive(Debug, Clone, Deserialize)]
pub struct EquipmentDraft {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Units owned
    pub stock: u32,
    /// Units out of service
    #[serde(default)]
    pub in_repair: u32,
    /// Administrative override (defaults to `true`)
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl StockCheckable for Equipment {
    type Amount = u32;

    fn has_enough_stock_available(&self, required: u32) -> bool {
        self.stock.saturating_sub(self.in_repair) >= required
    }
}

impl StockItem for Equipment {
    const KIND: StockKind = StockKind::Equipment;
    type Draft = EquipmentDraft;

    fn id(&self) -> StockItemId {
        self.id
    }

    fn is_flagged_available(&self) -> bool {
        self.is_available
    }

    fn deletion(&self) -> &Deletion {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut Deletion {
        &mut self.deletion
    }

    fn from_draft(draft: EquipmentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: StockItemId::new(),
            name: draft.name,
            description: draft.description,
            stock: draft.stock,
            in_repair: draft.in_repair,
            is_available: draft.is_available,
            created_at: now,
            updated_at: now,
            deletion: Deletion::Active,
        }
    }

    fn apply_draft(&mut self, draft: EquipmentDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.stock = draft.stock;
        self.in_repair = draft.in_repair;
        self.is_available = draft.is_available;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// ============================================================================
// Material
// ============================================================================

/// Consumable lab material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Record id
    pub id: StockItemId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Units owned
    pub stock: u32,
    /// Units already handed out
    pub in_use: u32,
    /// Administrative override
    pub is_available: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete state
    #[serde(default)]
    pub deletion: Deletion,
}

/// Create/update payload for [`Material`].
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDraft {
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Units owned
    pub stock: u32,
    /// Units already handed out
    #[serde(default)]
    pub in_use: u32,
    /// Administrative override (defaults to `true`)
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl StockCheckable for Material {
    type Amount = u32;

    fn has_enough_stock_available(&self, required: u32) -> bool {
        self.stock.saturating_sub(self.in_use) >= required
    }
}

impl StockItem for Material {
    const KIND: StockKind = StockKind::Material;
    type Draft = MaterialDraft;

    fn id(&self) -> StockItemId {
        self.id
    }

    fn is_flagged_available(&self) -> bool {
        self.is_available
    }

    fn deletion(&self) -> &Deletion {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut Deletion {
        &mut self.deletion
    }

    fn from_draft(draft: MaterialDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: StockItemId::new(),
            name: draft.name,
            description: draft.description,
            stock: draft.stock,
            in_use: draft.in_use,
            is_available: draft.is_available,
            created_at: now,
            updated_at: now,
            deletion: Deletion::Active,
        }
    }

    fn apply_draft(&mut self, draft: MaterialDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.description = draft.description;
        self.stock = draft.stock;
        self.in_use = draft.in_use;
        self.is_available = draft.is_available;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// ============================================================================
// Reactive
// ============================================================================

/// Reactive chemical. Stock is a plain quantity in `unit`, with no
/// reservation or repair bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reactive {
    /// Record id
    pub id: StockItemId,
    /// Display name
    pub name: String,
    /// Chemical formula
    #[serde(default)]
    pub formula: String,
    /// Quantity on hand
    pub stock: f64,
    /// Unit of `stock` (ml, g, ...)
    pub unit: String,
    /// Administrative override
    pub is_available: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete state
    #[serde(default)]
    pub deletion: Deletion,
}

/// Create/update payload for [`Reactive`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReactiveDraft {
    /// Display name
    pub name: String,
    /// Chemical formula
    #[serde(default)]
    pub formula: String,
    /// Quantity on hand
    pub stock: f64,
    /// Unit of `stock`
    pub unit: String,
    /// Administrative override (defaults to `true`)
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl StockCheckable for Reactive {
    type Amount = f64;

    fn has_enough_stock_available(&self, required: f64) -> bool {
        self.stock >= required
    }
}

impl StockItem for Reactive {
    const KIND: StockKind = StockKind::Reactive;
    type Draft = ReactiveDraft;

    fn id(&self) -> StockItemId {
        self.id
    }

    fn is_flagged_available(&self) -> bool {
        self.is_available
    }

    fn deletion(&self) -> &Deletion {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut Deletion {
        &mut self.deletion
    }

    fn from_draft(draft: ReactiveDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: StockItemId::new(),
            name: draft.name,
            formula: draft.formula,
            stock: draft.stock,
            unit: draft.unit,
            is_available: draft.is_available,
            created_at: now,
            updated_at: now,
            deletion: Deletion::Active,
        }
    }

    fn apply_draft(&mut self, draft: ReactiveDraft, now: DateTime<Utc>) {
        self.name = draft.name;
        self.formula = draft.formula;
        self.stock = draft.stock;
        self.unit = draft.unit;
        self.is_available = draft.is_available;
        self.updated_at = now;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
