//! Stock registry: per-kind storage seam and the catalog operations on top.

use super::types::{Equipment, Material, Reactive, StockItem};
use crate::error::{LabError, Result};
use crate::types::{Deletion, StockItemId, UserId};
use async_trait::async_trait;
use labdesk_core::environment::Clock;
use std::sync::Arc;

/// Storage for one stock kind.
///
/// Implementations wrap every persistence failure in
/// [`LabError::Storage`] naming the kind and operation, e.g.
/// `"fetch available equipments"`.
#[async_trait]
pub trait StockRegistry<T: StockItem>: Send + Sync {
    /// List records, filtered as described by [`StockItem::matches_filter`].
    async fn list(&self, available: Option<bool>) -> Result<Vec<T>>;

    /// Fetch one record. Absence is `Ok(None)`.
    async fn get(&self, id: StockItemId) -> Result<Option<T>>;

    /// Insert a new record.
    async fn insert(&self, item: &T) -> Result<()>;

    /// Overwrite an existing record.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when no record has this id.
    async fn update(&self, item: &T) -> Result<()>;
}

/// The three registries, one per kind.
#[derive(Clone)]
pub struct StockRegistries {
    /// Equipment registry
    pub equipment: Arc<dyn StockRegistry<Equipment>>,
    /// Material registry
    pub materials: Arc<dyn StockRegistry<Material>>,
    /// Reactive registry
    pub reactives: Arc<dyn StockRegistry<Reactive>>,
}

/// Picks the registry for `T` out of [`StockRegistries`].
pub trait HasRegistry<T: StockItem> {
    /// Registry holding records of kind `T`.
    fn registry(&self) -> &Arc<dyn StockRegistry<T>>;
}

impl HasRegistry<Equipment> for StockRegistries {
    fn registry(&self) -> &Arc<dyn StockRegistry<Equipment>> {
        &self.equipment
    }
}

impl HasRegistry<Material> for StockRegistries {
    fn registry(&self) -> &Arc<dyn StockRegistry<Material>> {
        &self.materials
    }
}

impl HasRegistry<Reactive> for StockRegistries {
    fn registry(&self) -> &Arc<dyn StockRegistry<Reactive>> {
        &self.reactives
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Plain CRUD over the stock registries with timestamp stamping and soft delete.
#[derive(Clone)]
pub struct StockCatalog {
    registries: StockRegistries,
    clock: Arc<dyn Clock>,
}

impl StockCatalog {
    /// Create a catalog over `registries`.
    #[must_use]
    pub fn new(registries: StockRegistries, clock: Arc<dyn Clock>) -> Self {
        Self { registries, clock }
    }

    /// The underlying registries.
    #[must_use]
    pub const fn registries(&self) -> &StockRegistries {
        &self.registries
    }

    /// List records of kind `T`.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    pub async fn list<T>(&self, available: Option<bool>) -> Result<Vec<T>>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        self.registries.registry().list(available).await
    }

    /// Fetch a record of kind `T`, soft-deleted ones included.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when the id is unknown.
    pub async fn get<T>(&self, id: StockItemId) -> Result<T>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        self.registries
            .registry()
            .get(id)
            .await?
            .ok_or_else(|| LabError::not_found(T::KIND.label(), id))
    }

    /// Create a record from a draft.
    ///
    /// # Errors
    ///
    /// Propagates registry failures.
    #[tracing::instrument(skip(self, draft), fields(kind = %T::KIND))]
    pub async fn create<T>(&self, draft: T::Draft) -> Result<T>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        let item = T::from_draft(draft, self.clock.now());
        self.registries.registry().insert(&item).await?;
        tracing::info!(id = %item.id(), "Stock item created");
        Ok(item)
    }

    /// Replace the editable fields of a live record.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when the id is unknown or soft-deleted.
    #[tracing::instrument(skip(self, draft), fields(kind = %T::KIND))]
    pub async fn update<T>(&self, id: StockItemId, draft: T::Draft) -> Result<T>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        let mut item = self.live::<T>(id).await?;
        item.apply_draft(draft, self.clock.now());
        self.registries.registry().update(&item).await?;
        Ok(item)
    }

    /// Soft-delete a record.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when the id is unknown or already deleted.
    #[tracing::instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn delete<T>(&self, id: StockItemId, by: UserId) -> Result<()>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        let mut item = self.live::<T>(id).await?;
        let now = self.clock.now();
        *item.deletion_mut() = Deletion::Deleted { by, at: now };
        item.touch(now);
        self.registries.registry().update(&item).await?;
        tracing::info!(%id, "Stock item deleted");
        Ok(())
    }

    async fn live<T>(&self, id: StockItemId) -> Result<T>
    where
        T: StockItem,
        StockRegistries: HasRegistry<T>,
    {
        let item = self.get::<T>(id).await?;
        if item.deletion().is_deleted() {
            return Err(LabError::not_found(T::KIND.label(), id));
        }
        Ok(item)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::InMemoryStockRegistry;
    use crate::stock::types::{EquipmentDraft, ReactiveDraft};
    use labdesk_testing::test_clock;

    fn catalog() -> StockCatalog {
        let registries = StockRegistries {
            equipment: Arc::new(InMemoryStockRegistry::<Equipment>::new()),
            materials: Arc::new(InMemoryStockRegistry::<Material>::new()),
            reactives: Arc::new(InMemoryStockRegistry::<Reactive>::new()),
        };
        StockCatalog::new(registries, Arc::new(test_clock()))
    }

    fn burette() -> EquipmentDraft {
        EquipmentDraft {
            name: "Burette".to_string(),
            description: "50 ml".to_string(),
            stock: 6,
            in_repair: 1,
            is_available: true,
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let catalog = catalog();
        let created: Equipment = catalog.create(burette()).await.unwrap();

        let fetched: Equipment = catalog.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let catalog = catalog();
        let created: Reactive = catalog
            .create(ReactiveDraft {
                name: "Acetone".to_string(),
                formula: "C3H6O".to_string(),
                stock: 1.0,
                unit: "l".to_string(),
                is_available: true,
            })
            .await
            .unwrap();

        let updated: Reactive = catalog
            .update(
                created.id,
                ReactiveDraft {
                    name: "Acetone".to_string(),
                    formula: "C3H6O".to_string(),
                    stock: 4.0,
                    unit: "l".to_string(),
                    is_available: false,
                },
            )
            .await
            .unwrap();

        assert!((updated.stock - 4.0).abs() < f64::EPSILON);
        assert!(!updated.is_available);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let catalog = catalog();
        let created: Equipment = catalog.create(burette()).await.unwrap();
        let admin = UserId::new();

        catalog.delete::<Equipment>(created.id, admin).await.unwrap();
        let err = catalog
            .delete::<Equipment>(created.id, admin)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deleted_items_leave_the_available_listing() {
        let catalog = catalog();
        let created: Equipment = catalog.create(burette()).await.unwrap();
        catalog
            .delete::<Equipment>(created.id, UserId::new())
            .await
            .unwrap();

        let available: Vec<Equipment> = catalog.list(Some(true)).await.unwrap();
        assert!(available.is_empty());

        let everything: Vec<Equipment> = catalog.list(None).await.unwrap();
        assert_eq!(everything.len(), 1);
        assert!(everything[0].deletion.is_deleted());
    }

    #[tokio::test]
    async fn updating_deleted_item_is_not_found() {
        let catalog = catalog();
        let created: Equipment = catalog.create(burette()).await.unwrap();
        catalog
            .delete::<Equipment>(created.id, UserId::new())
            .await
            .unwrap();

        let err = catalog
            .update::<Equipment>(created.id, burette())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
