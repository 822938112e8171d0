//! Dry-run availability check.
//!
//! `POST /api/availability` runs the same checker request creation uses and
//! reports the outcome without storing anything.
//!
//! ```text
//! POST /api/availability
//! {"equipments":[{"id":"…","amount":2}]}
//! 200 {"available":false,"reason":"Equipment unavailable"}
//! ```

use super::ApiResult;
use crate::availability::{AvailabilityQuery, AvailabilityReport};
use crate::server::state::AppState;
use axum::{extract::State, Json};
use labdesk_web::Principal;

/// Check `query` against current stock.
///
/// An empty query is trivially available.
///
/// # Errors
///
/// 500 when a registry fetch fails.
pub async fn check(
    State(state): State<AppState>,
    _principal: Principal,
    Json(query): Json<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityReport>> {
    let availability = state.requests.checker().check(&query).await?;
    Ok(Json(availability.into()))
}
