//! In-memory provider implementations.
//!
//! Used by the unit and integration tests and by the server when
//! `STORAGE_BACKEND=memory`. Every repository can be told to fail
//! (`fail_with`) so the infrastructure-error paths can be exercised.

pub mod accounts;
pub mod broadcast;
pub mod conversation;
pub mod request;
pub mod stock;

pub use accounts::InMemoryAccounts;
pub use broadcast::RecordingBroadcaster;
pub use conversation::InMemoryConversationRepository;
pub use request::InMemoryRequestRepository;
pub use stock::InMemoryStockRegistry;

use crate::error::{LabError, Result};
use std::sync::{Mutex, MutexGuard};

/// Injected failure shared by the in-memory repositories.
#[derive(Debug, Default)]
pub(crate) struct FailureSwitch {
    cause: Mutex<Option<String>>,
}

impl FailureSwitch {
    pub(crate) fn set(&self, cause: impl Into<String>) {
        *self
            .cause
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(cause.into());
    }

    pub(crate) fn clear(&self) {
        *self
            .cause
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// `Err(Storage)` for `operation` while a failure is set.
    pub(crate) fn check(&self, operation: impl FnOnce() -> String) -> Result<()> {
        let cause = self
            .cause
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        match cause {
            Some(cause) => Err(LabError::storage(operation(), cause)),
            None => Ok(()),
        }
    }
}

/// Lock `mutex`, reporting poisoning as a storage failure of `operation`.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, operation: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| LabError::storage(operation, "in-memory store poisoned"))
}
