//! Request lifecycle service: the imperative shell around [`RequestReducer`].
//!
//! Every operation follows the same shape: load, decide (checker or
//! reducer), persist, then run the reducer's effects.
//!
//! Saves are conditional on the version that was loaded. When two writers
//! race on one request, the second gets [`LabError::Conflict`] and nothing
//! it decided is written.

use super::{
    validate_amounts, NewRequest, Request, RequestAction, RequestEnvironment, RequestPatch,
    RequestReducer, RequestState, RequestStatus,
};
use crate::availability::{Availability, AvailabilityChecker, AvailabilityQuery};
use crate::conversation::ConversationService;
use crate::error::{LabError, Result};
use crate::metrics;
use crate::providers::{RequestRepository, UserRepository};
use crate::types::{Deletion, RequestId, UserId};
use labdesk_core::{effect::run_all, reducer::Reducer};
use std::sync::Arc;

/// Owns the request aggregate: creation, edits, transitions, expiration and
/// soft delete.
#[derive(Clone)]
pub struct RequestService {
    requests: Arc<dyn RequestRepository>,
    users: Arc<dyn UserRepository>,
    conversations: ConversationService,
    checker: Arc<AvailabilityChecker>,
    reducer: RequestReducer,
    env: RequestEnvironment,
}

impl RequestService {
    /// Create the service.
    #[must_use]
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        users: Arc<dyn UserRepository>,
        conversations: ConversationService,
        checker: Arc<AvailabilityChecker>,
        env: RequestEnvironment,
    ) -> Self {
        Self {
            requests,
            users,
            conversations,
            checker,
            reducer: RequestReducer::new(),
            env,
        }
    }

    /// The availability checker requests are admitted with.
    #[must_use]
    pub fn checker(&self) -> &AvailabilityChecker {
        &self.checker
    }

    /// Validate and store a new request in `PENDING`.
    ///
    /// The empty check runs before any registry access.
    ///
    /// # Errors
    ///
    /// - [`LabError::EmptyRequest`] when no line is given
    /// - [`LabError::Validation`] for a zero or non-finite amount
    /// - [`LabError::Unavailable`] naming the first short kind
    /// - [`LabError::Storage`] on registry or persistence failure
    #[tracing::instrument(skip(self, new), fields(%creator))]
    pub async fn create(&self, creator: UserId, new: NewRequest) -> Result<RequestId> {
        self.admit(&new.availability_query()).await?;

        let id = RequestId::new();
        let number = self.requests.next_number().await?;
        let conversation = self.conversations.open(id).await?;
        let now = self.env.clock().now();

        let request = Request {
            id,
            number,
            requestant: creator,
            assigned: None,
            status: RequestStatus::Pending,
            creation_date: now,
            usage_date: new.usage_date,
            equipments: new.equipments,
            materials: new.materials,
            reactives: new.reactives,
            conversation: Some(conversation.id),
            observations: new.observations,
            rejection_reason: None,
            updated_at: now,
            deletion: Deletion::Active,
            version: 0,
        };

        self.requests.insert(&request).await?;
        metrics::record_request("created");
        tracing::info!(%id, number, "Request created");
        Ok(id)
    }

    /// Apply a partial update, re-validating the merged lines.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`] when the request is unknown or deleted
    /// - [`LabError::InvalidTransition`] when the request is already closed
    /// - the same rejections as [`create`](Self::create)
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: RequestId, patch: RequestPatch) -> Result<Request> {
        let current = self.get(id).await?;
        if current.deletion.is_deleted() {
            return Err(LabError::not_found("Request", id));
        }
        if current.status.is_terminal() {
            return Err(LabError::InvalidTransition {
                status: current.status.as_str().to_string(),
                action: "update",
            });
        }

        let mut merged = patch.merged_into(current);
        self.admit(&merged.availability_query()).await?;

        merged.updated_at = self.env.clock().now();
        merged.version = self.requests.update(&merged).await?;
        tracing::info!(%id, "Request updated");
        Ok(merged)
    }

    /// Fetch a request, applying the expiration rule first.
    ///
    /// A live `PENDING`/`APPROVED` request older than the TTL is rejected and
    /// the rejection is persisted before it is returned.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`] when the id is unknown
    /// - [`LabError::Storage`] on persistence failure
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: RequestId) -> Result<Request> {
        let request = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| LabError::not_found("Request", id))?;

        self.reconcile(request).await
    }

    /// List live requests, optionally by status. No expiration is applied.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn get_all(&self, status: Option<RequestStatus>) -> Result<Vec<Request>> {
        self.requests.list(status).await
    }

    /// Soft-delete a request.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when the id is unknown or already deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: RequestId, deleted_by: UserId) -> Result<()> {
        let request = self.get(id).await?;
        if request.deletion.is_deleted() {
            return Err(LabError::not_found("Request", id));
        }

        self.dispatch(request, RequestAction::SoftDelete { by: deleted_by })
            .await?;
        metrics::record_request("deleted");
        tracing::info!(%id, %deleted_by, "Request deleted");
        Ok(())
    }

    /// `PENDING` → `APPROVED`.
    ///
    /// # Errors
    ///
    /// [`LabError::InvalidTransition`] from any other status.
    pub async fn approve(&self, id: RequestId, by: UserId) -> Result<Request> {
        self.transition(id, RequestAction::Approve { by }, "approved")
            .await
    }

    /// `PENDING`/`APPROVED` → `REJECTED`.
    ///
    /// # Errors
    ///
    /// [`LabError::InvalidTransition`] from a terminal status.
    pub async fn reject(
        &self,
        id: RequestId,
        by: UserId,
        reason: Option<String>,
    ) -> Result<Request> {
        self.transition(id, RequestAction::Reject { by, reason }, "rejected")
            .await
    }

    /// `APPROVED` → `COMPLETED`.
    ///
    /// # Errors
    ///
    /// [`LabError::InvalidTransition`] from any other status.
    pub async fn complete(&self, id: RequestId, by: UserId) -> Result<Request> {
        self.transition(id, RequestAction::Complete { by }, "completed")
            .await
    }

    /// Hand an open request to `staff`.
    ///
    /// # Errors
    ///
    /// - [`LabError::Validation`] when `staff` is not an active staff member
    ///   or administrator
    /// - [`LabError::InvalidTransition`] from a terminal status
    pub async fn assign(&self, id: RequestId, staff: UserId, by: UserId) -> Result<Request> {
        let assignee = self.users.get(staff).await?;
        if !assignee.is_some_and(|user| user.deletion.is_active() && user.role.is_staff()) {
            tracing::info!(%id, %staff, "Assignment refused: not lab staff");
            return Err(LabError::Validation(format!("User {staff} is not a lab staff member")));
        }

        self.transition(id, RequestAction::Assign { staff, by }, "assigned")
            .await
    }

    /// Apply the expiration rule to every open request.
    ///
    /// Returns how many requests were rejected. A failure on one request is
    /// logged and does not stop the sweep.
    ///
    /// # Errors
    ///
    /// Propagates failures listing the open requests.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = self.env.clock().now();
        let ttl = self.env.ttl_seconds();
        let mut expired = 0;

        for status in [RequestStatus::Pending, RequestStatus::Approved] {
            for request in self.requests.list(Some(status)).await? {
                if !request.should_expire(now, ttl) {
                    continue;
                }
                let id = request.id;
                match self.reconcile(request).await {
                    Ok(_) => expired += 1,
                    Err(e) => tracing::error!(%id, error = %e, "Failed to expire request"),
                }
            }
        }

        if expired > 0 {
            tracing::info!(expired, "Expiration sweep rejected requests");
        }
        Ok(expired)
    }

    // ═══════════════════════════════════════════════════════════════════

    /// Empty check, amount check, then the availability checker.
    async fn admit(&self, query: &AvailabilityQuery) -> Result<()> {
        if query.is_empty() {
            metrics::record_request("rejected_empty");
            tracing::info!("Request rejected: no lines");
            return Err(LabError::EmptyRequest);
        }
        validate_amounts(query)?;

        match self.checker.check(query).await? {
            Availability::Available => Ok(()),
            Availability::Unavailable { kind } => {
                metrics::record_request("rejected_unavailable");
                Err(LabError::Unavailable { kind })
            }
        }
    }

    async fn reconcile(&self, request: Request) -> Result<Request> {
        if !request.should_expire(self.env.clock().now(), self.env.ttl_seconds()) {
            return Ok(request);
        }

        let id = request.id;
        let request = self.dispatch(request, RequestAction::Expire).await?;
        metrics::record_request("expired");
        tracing::info!(%id, "Request expired");
        Ok(request)
    }

    async fn transition(
        &self,
        id: RequestId,
        action: RequestAction,
        outcome: &'static str,
    ) -> Result<Request> {
        let request = self.get(id).await?;
        let verb = action.verb();
        let request = self.dispatch(request, action).await.inspect_err(|e| {
            tracing::info!(%id, action = verb, error = %e, "Transition refused");
        })?;
        metrics::record_request(outcome);
        tracing::info!(%id, status = %request.status, "Request {outcome}");
        Ok(request)
    }

    /// Run one action through the reducer, persist the result and execute
    /// its effects.
    async fn dispatch(&self, request: Request, action: RequestAction) -> Result<Request> {
        let mut state = RequestState::new(request);
        let effects = self.reducer.reduce(&mut state, action, &self.env);

        if let Some(error) = state.last_error {
            return Err(error);
        }
        if effects.is_empty() {
            return Ok(state.request);
        }

        state.request.version = self.requests.update(&state.request).await?;
        run_all(effects).await;
        Ok(state.request)
    }
}
