//! Reducer for request status and deletion changes.

use super::{RequestAction, RequestEnvironment, RequestState, RequestStatus};
use crate::broadcast::RoomEvent;
use crate::error::LabError;
use crate::types::Deletion;
use labdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use serde_json::json;

/// Room event kind published when a request changes.
pub const STATUS_EVENT: &str = "request.status";

/// Pure state machine for a single request.
///
/// Rejected actions leave the request untouched, record the reason in
/// `state.last_error` and produce no effects. Accepted actions produce one
/// effect publishing a [`STATUS_EVENT`] to the request's room.
#[derive(Debug, Clone, Copy)]
pub struct RequestReducer;

impl RequestReducer {
    /// Create a new request reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RequestReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RequestReducer {
    type State = RequestState;
    type Action = RequestAction;
    type Environment = RequestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        state.last_error = None;
        let now = env.clock().now();
        let request = &mut state.request;

        if request.deletion.is_deleted() {
            // Expiring a deleted request is a silent no-op; anything else is addressed
            // at something that no longer exists.
            if action != RequestAction::Expire {
                state.last_error = Some(LabError::not_found("Request", request.id));
            }
            return SmallVec::new();
        }

        let verb = action.verb();
        let origin = action.actor();

        match action {
            RequestAction::Approve { .. } => {
                if request.status != RequestStatus::Pending {
                    return reject(state, verb);
                }
                request.status = RequestStatus::Approved;
            }

            RequestAction::Reject { reason, .. } => {
                if request.status.is_terminal() {
                    return reject(state, verb);
                }
                request.status = RequestStatus::Rejected;
                request.rejection_reason = reason;
            }

            RequestAction::Complete { .. } => {
                if request.status != RequestStatus::Approved {
                    return reject(state, verb);
                }
                request.status = RequestStatus::Completed;
            }

            RequestAction::Assign { staff, .. } => {
                if request.status.is_terminal() {
                    return reject(state, verb);
                }
                request.assigned = Some(staff);
            }

            RequestAction::Expire => {
                let (reconciled, expired) =
                    request.clone().reconcile_expiration(now, env.ttl_seconds());
                if !expired {
                    return SmallVec::new();
                }
                *request = reconciled;
            }

            RequestAction::SoftDelete { by } => {
                request.deletion = Deletion::Deleted { by, at: now };
            }
        }

        request.updated_at = now;

        let event = RoomEvent::for_request(
            request.id,
            origin,
            STATUS_EVENT,
            json!({
                "id": request.id,
                "number": request.number,
                "status": request.status,
                "assigned": request.assigned,
                "reason": request.rejection_reason,
                "deleted": request.deletion.is_deleted(),
            }),
        );
        let broadcaster = env.broadcaster();

        smallvec![Effect::Future(Box::pin(async move {
            broadcaster.publish(event).await;
            None
        }))]
    }
}

fn reject(
    state: &mut RequestState,
    action: &'static str,
) -> SmallVec<[Effect<RequestAction>; 4]> {
    state.last_error = Some(LabError::InvalidTransition {
        status: state.request.status.as_str().to_string(),
        action,
    });
    SmallVec::new()
}
