//! Lab request endpoints.
//!
//! - `POST /api/requests` - Create a request for the caller
//! - `GET /api/requests` - List (`?status=PENDING|APPROVED|REJECTED|COMPLETED`);
//!   non-staff callers see only their own requests
//! - `GET /api/requests/:id` - Get one request (expiration applied)
//! - `PATCH /api/requests/:id` - Edit lines, date or notes (owner or staff)
//! - `DELETE /api/requests/:id` - Soft delete (owner or staff)
//! - `POST /api/requests/:id/approve|reject|complete|assign` - Staff transitions

use super::{caller, is_staff, ApiResult, STAFF_ROLES};
use crate::error::LabError;
use crate::request::{NewRequest, Request, RequestPatch, RequestStatus};
use crate::server::state::AppState;
use crate::types::{RequestId, UserId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use labdesk_web::{AppError, Principal};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response after creating a request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// Id of the new request
    pub id: RequestId,
}

/// Query parameters for listing requests.
#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    /// Exact status to filter on
    pub status: Option<RequestStatus>,
}

/// Body of a reject call.
#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    /// Reason shown to the requester
    pub reason: Option<String>,
}

/// Body of an assign call.
#[derive(Debug, Deserialize)]
pub struct AssignBody {
    /// Staff member taking the request
    pub staff: UserId,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a request owned by the caller.
///
/// # Errors
///
/// 400 for an empty request, a bad amount or short stock; 500 when the
/// registry or storage fails.
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Json(new): Json<NewRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.requests.create(caller(&principal), new).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// List live requests.
///
/// # Errors
///
/// 500 when storage fails.
pub async fn list(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<Vec<Request>>> {
    let mut requests = state.requests.get_all(query.status).await?;
    if !is_staff(&principal) {
        let me = caller(&principal);
        requests.retain(|r| r.requestant == me);
    }
    Ok(Json(requests))
}

/// Get one request.
///
/// # Errors
///
/// 404 when unknown or deleted, 403 when the caller may not see it.
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<Request>> {
    Ok(Json(visible_request(&state, &principal, id).await?))
}

/// Edit a request that is still open.
///
/// # Errors
///
/// Same as [`create`], plus 404/403 as in [`get`].
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
    Json(patch): Json<RequestPatch>,
) -> ApiResult<Json<Request>> {
    visible_request(&state, &principal, id).await?;
    Ok(Json(state.requests.update(id, patch).await?))
}

/// Soft-delete a request.
///
/// # Errors
///
/// 404 when unknown or already deleted, 403 when the caller may not see it.
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
) -> ApiResult<StatusCode> {
    visible_request(&state, &principal, id).await?;
    state.requests.delete(id, caller(&principal)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PENDING` → `APPROVED`.
///
/// # Errors
///
/// 403 for non-staff, 400 from any other status.
pub async fn approve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<Request>> {
    principal.require_any_role(STAFF_ROLES)?;
    Ok(Json(state.requests.approve(id, caller(&principal)).await?))
}

/// Reject an open request.
///
/// # Errors
///
/// 403 for non-staff, 400 when already closed.
pub async fn reject(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
    body: Option<Json<RejectBody>>,
) -> ApiResult<Json<Request>> {
    principal.require_any_role(STAFF_ROLES)?;
    let reason = body.and_then(|Json(body)| body.reason);
    Ok(Json(
        state.requests.reject(id, caller(&principal), reason).await?,
    ))
}

/// `APPROVED` → `COMPLETED`.
///
/// # Errors
///
/// 403 for non-staff, 400 from any other status.
pub async fn complete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<Request>> {
    principal.require_any_role(STAFF_ROLES)?;
    Ok(Json(state.requests.complete(id, caller(&principal)).await?))
}

/// Hand an open request to a staff member.
///
/// # Errors
///
/// 403 for non-staff, 400 when already closed.
pub async fn assign(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
    Json(body): Json<AssignBody>,
) -> ApiResult<Json<Request>> {
    principal.require_any_role(STAFF_ROLES)?;
    Ok(Json(
        state
            .requests
            .assign(id, body.staff, caller(&principal))
            .await?,
    ))
}

/// Load a live request the caller is allowed to see.
pub(crate) async fn visible_request(
    state: &AppState,
    principal: &Principal,
    id: RequestId,
) -> ApiResult<Request> {
    let request = state.requests.get(id).await?;
    if request.deletion.is_deleted() {
        return Err(AppError::not_found("Request", id));
    }
    if !is_staff(principal) && request.requestant != caller(principal) {
        return Err(LabError::Forbidden(format!("Request {id} belongs to another user")).into());
    }
    Ok(request)
}
