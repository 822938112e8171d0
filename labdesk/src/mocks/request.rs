//! In-memory request repository.

use super::{lock, FailureSwitch};
use crate::error::{LabError, Result};
use crate::providers::RequestRepository;
use crate::request::{Request, RequestStatus};
use crate::types::RequestId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Request repository over a `HashMap` with a monotonic number counter.
///
/// Saves are compare-and-swap on [`Request::version`] under the map lock.
#[derive(Debug)]
pub struct InMemoryRequestRepository {
    requests: Arc<Mutex<HashMap<RequestId, Request>>>,
    numbers: AtomicI64,
    failure: FailureSwitch,
}

impl InMemoryRequestRepository {
    /// Create an empty repository. Numbers start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            numbers: AtomicI64::new(0),
            failure: FailureSwitch::default(),
        }
    }

    /// Put `request` in the repository directly, bypassing failure injection.
    pub fn seed(&self, request: Request) {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(request.id, request);
    }

    /// Stored copy of a request, without any lifecycle logic.
    pub fn raw(&self, id: RequestId) -> Option<Request> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Make every following call fail with `cause`.
    pub fn fail_with(&self, cause: impl Into<String>) {
        self.failure.set(cause);
    }

    /// Stop failing.
    pub fn recover(&self) {
        self.failure.clear();
    }
}

impl Default for InMemoryRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn next_number(&self) -> Result<i64> {
        self.failure.check(|| "allocate request number".to_string())?;
        Ok(self.numbers.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert(&self, request: &Request) -> Result<()> {
        let operation = format!("insert request {}", request.id);
        self.failure.check(|| operation.clone())?;
        lock(&self.requests, &operation)?.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>> {
        let operation = format!("load request {id}");
        self.failure.check(|| operation.clone())?;
        Ok(lock(&self.requests, &operation)?.get(&id).cloned())
    }

    async fn update(&self, request: &Request) -> Result<i64> {
        let operation = format!("update request {}", request.id);
        self.failure.check(|| operation.clone())?;
        let mut requests = lock(&self.requests, &operation)?;
        let slot = requests
            .get_mut(&request.id)
            .ok_or_else(|| LabError::not_found("Request", request.id))?;
        if slot.version != request.version {
            return Err(LabError::conflict("Request", request.id, request.version, slot.version));
        }

        let version = request.version + 1;
        *slot = Request {
            version,
            ..request.clone()
        };
        Ok(version)
    }

    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>> {
        let operation = "fetch requests";
        self.failure.check(|| operation.to_string())?;
        let requests = lock(&self.requests, operation)?;
        let mut listed: Vec<Request> = requests
            .values()
            .filter(|r| r.deletion.is_active())
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(listed)
    }
}
