//! Availability checker.
//!
//! Decides whether a proposed set of request lines can be served from current
//! stock. Groups are evaluated in a fixed order (equipment, then material,
//! then reactive) and the first group that fails decides the reason:
//!
//! ```text
//! for (kind, registry, lines) in [equipment, material, reactive]:
//!     if lines is empty: continue            // nothing requested, no fetch
//!     available = registry.list(available = true)   // one bulk fetch
//!     for line in lines:
//!         if line.id not in available or not enough stock: return Unavailable(kind)
//! return Available
//! ```
//!
//! The checker only reads stock. Two concurrent requests for the same item can
//! both be admitted; nothing is reserved on admission.

use crate::error::Result;
use crate::metrics;
use crate::stock::{
    Equipment, Material, Reactive, StockCheckable, StockItem, StockRegistries, StockRegistry,
};
use crate::types::{StockItemId, StockKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One requested line: which item and how much of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineItem<A> {
    /// Referenced stock item
    pub id: StockItemId,
    /// Requested amount
    pub amount: A,
}

impl<A> LineItem<A> {
    /// Build a line.
    pub const fn new(id: StockItemId, amount: A) -> Self {
        Self { id, amount }
    }
}

/// Candidate lines grouped by kind. Any group may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    /// Equipment lines
    #[serde(default)]
    pub equipments: Vec<LineItem<u32>>,
    /// Material lines
    #[serde(default)]
    pub materials: Vec<LineItem<u32>>,
    /// Reactive lines
    #[serde(default)]
    pub reactives: Vec<LineItem<f64>>,
}

impl AvailabilityQuery {
    /// Whether no line of any kind is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.equipments.is_empty() && self.materials.is_empty() && self.reactives.is_empty()
    }
}

/// Outcome of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Every group can be served
    Available,
    /// The first group (in check order) that cannot be served
    Unavailable {
        /// Kind of the failing group
        kind: StockKind,
    },
}

impl Availability {
    /// Whether the request can be served.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Human-readable rejection reason, e.g. `"Equipment unavailable"`.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Available => None,
            Self::Unavailable { kind } => Some(format!("{kind} unavailable")),
        }
    }
}

/// Wire shape of an availability outcome: `{ "available": bool, "reason"?: string }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// Whether the request can be served
    pub available: bool,
    /// Why not, when it cannot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Availability> for AvailabilityReport {
    fn from(availability: Availability) -> Self {
        Self {
            available: availability.is_available(),
            reason: availability.reason(),
        }
    }
}

// ============================================================================
// Group checks
// ============================================================================

/// One entry of the ordered check list.
#[async_trait]
trait GroupCheck: Send + Sync {
    fn kind(&self) -> StockKind;

    /// `Ok(true)` when every line of this group in `query` can be served.
    async fn satisfied(&self, query: &AvailabilityQuery) -> Result<bool>;
}

struct RegistryGroup<T: StockItem> {
    registry: Arc<dyn StockRegistry<T>>,
    lines: fn(&AvailabilityQuery) -> &[LineItem<T::Amount>],
}

#[async_trait]
impl<T: StockItem> GroupCheck for RegistryGroup<T> {
    fn kind(&self) -> StockKind {
        T::KIND
    }

    async fn satisfied(&self, query: &AvailabilityQuery) -> Result<bool> {
        let lines = (self.lines)(query);
        if lines.is_empty() {
            return Ok(true);
        }

        let available = self.registry.list(Some(true)).await?;
        let by_id: HashMap<StockItemId, &T> =
            available.iter().map(|item| (item.id(), item)).collect();

        Ok(lines.iter().all(|line| {
            by_id
                .get(&line.id)
                .is_some_and(|item| item.has_enough_stock_available(line.amount))
        }))
    }
}

/// Checks candidate lines against the stock registries.
pub struct AvailabilityChecker {
    groups: Vec<Box<dyn GroupCheck>>,
}

impl AvailabilityChecker {
    /// Build the checker with the equipment → material → reactive order.
    #[must_use]
    pub fn new(registries: &StockRegistries) -> Self {
        let groups: Vec<Box<dyn GroupCheck>> = vec![
            Box::new(RegistryGroup::<Equipment> {
                registry: Arc::clone(&registries.equipment),
                lines: |q| q.equipments.as_slice(),
            }),
            Box::new(RegistryGroup::<Material> {
                registry: Arc::clone(&registries.materials),
                lines: |q| q.materials.as_slice(),
            }),
            Box::new(RegistryGroup::<Reactive> {
                registry: Arc::clone(&registries.reactives),
                lines: |q| q.reactives.as_slice(),
            }),
        ];
        Self { groups }
    }

    /// Kinds in the order they are evaluated.
    pub fn order(&self) -> impl Iterator<Item = StockKind> + '_ {
        self.groups.iter().map(|group| group.kind())
    }

    /// Run the check, stopping at the first group that fails.
    ///
    /// # Errors
    ///
    /// Returns the registry's [`LabError::Storage`](crate::error::LabError::Storage)
    /// when a fetch fails; no later group is evaluated.
    #[tracing::instrument(skip_all, fields(
        equipments = query.equipments.len(),
        materials = query.materials.len(),
        reactives = query.reactives.len()
    ))]
    pub async fn check(&self, query: &AvailabilityQuery) -> Result<Availability> {
        for group in &self.groups {
            let satisfied = group.satisfied(query).await.inspect_err(|e| {
                metrics::record_availability_error();
                tracing::error!(kind = %group.kind(), error = %e, "Availability check failed");
            })?;

            if !satisfied {
                let kind = group.kind();
                metrics::record_availability_check(Some(kind));
                tracing::info!(%kind, "Request lines unavailable");
                return Ok(Availability::Unavailable { kind });
            }
        }

        metrics::record_availability_check(None);
        Ok(Availability::Available)
    }
}
