//! In-memory stock registry.

use super::{lock, FailureSwitch};
use crate::error::{LabError, Result};
use crate::stock::{StockItem, StockRegistry};
use crate::types::StockItemId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Stock registry over a `HashMap`, one instance per kind.
#[derive(Debug)]
pub struct InMemoryStockRegistry<T> {
    items: Arc<Mutex<HashMap<StockItemId, T>>>,
    list_calls: AtomicUsize,
    failure: FailureSwitch,
}

impl<T: StockItem> InMemoryStockRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            list_calls: AtomicUsize::new(0),
            failure: FailureSwitch::default(),
        }
    }

    /// Put `item` in the registry directly, bypassing failure injection.
    pub fn seed(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(item.id(), item);
    }

    /// How many times `list` has been called.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail with `cause`.
    pub fn fail_with(&self, cause: impl Into<String>) {
        self.failure.set(cause);
    }

    /// Stop failing.
    pub fn recover(&self) {
        self.failure.clear();
    }

    fn collection() -> &'static str {
        T::KIND.collection()
    }
}

impl<T: StockItem> Default for InMemoryStockRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: StockItem> StockRegistry<T> for InMemoryStockRegistry<T> {
    async fn list(&self, available: Option<bool>) -> Result<Vec<T>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let operation = match available {
            None => format!("fetch {}", Self::collection()),
            Some(true) => format!("fetch available {}", Self::collection()),
            Some(false) => format!("fetch unavailable {}", Self::collection()),
        };
        self.failure.check(|| operation.clone())?;

        let items = lock(&self.items, &operation)?;
        Ok(items
            .values()
            .filter(|item| item.matches_filter(available))
            .cloned()
            .collect())
    }

    async fn get(&self, id: StockItemId) -> Result<Option<T>> {
        let operation = format!("load {} {id}", T::KIND.label().to_lowercase());
        self.failure.check(|| operation.clone())?;
        Ok(lock(&self.items, &operation)?.get(&id).cloned())
    }

    async fn insert(&self, item: &T) -> Result<()> {
        let operation = format!("insert {} {}", T::KIND.label().to_lowercase(), item.id());
        self.failure.check(|| operation.clone())?;
        lock(&self.items, &operation)?.insert(item.id(), item.clone());
        Ok(())
    }

    async fn update(&self, item: &T) -> Result<()> {
        let operation = format!("update {} {}", T::KIND.label().to_lowercase(), item.id());
        self.failure.check(|| operation.clone())?;
        let mut items = lock(&self.items, &operation)?;
        match items.get_mut(&item.id()) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(LabError::not_found(T::KIND.label(), item.id())),
        }
    }
}
