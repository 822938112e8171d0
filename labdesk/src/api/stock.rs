//! Stock CRUD endpoints, generic over the record kind.
//!
//! Mounted three times, under `/api/equipments`, `/api/materials` and
//! `/api/reactives`:
//! - `GET /` - List records (`?available=true|false`)
//! - `GET /:id` - Get one record, soft-deleted ones included
//! - `POST /` - Create (staff)
//! - `PUT /:id` - Replace the editable fields (staff)
//! - `DELETE /:id` - Soft delete (staff)

use super::{caller, ApiResult, STAFF_ROLES};
use crate::server::state::AppState;
use crate::stock::{HasRegistry, StockItem, StockRegistries};
use crate::types::StockItemId;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use labdesk_web::Principal;
use serde::Deserialize;

/// Query parameters for listing stock.
#[derive(Debug, Default, Deserialize)]
pub struct StockFilter {
    /// `true`: only available records; `false`: only live records flagged
    /// unavailable; absent: everything
    pub available: Option<bool>,
}

/// List records of kind `T`.
///
/// # Errors
///
/// 500 when the registry fails.
pub async fn list<T>(
    State(state): State<AppState>,
    _principal: Principal,
    Query(filter): Query<StockFilter>,
) -> ApiResult<Json<Vec<T>>>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    Ok(Json(state.catalog.list::<T>(filter.available).await?))
}

/// Get one record of kind `T`.
///
/// # Errors
///
/// 404 when the id is unknown.
pub async fn get<T>(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<StockItemId>,
) -> ApiResult<Json<T>>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    Ok(Json(state.catalog.get::<T>(id).await?))
}

/// Create a record of kind `T`.
///
/// # Errors
///
/// 403 for non-staff callers.
pub async fn create<T>(
    State(state): State<AppState>,
    principal: Principal,
    Json(draft): Json<T::Draft>,
) -> ApiResult<(StatusCode, Json<T>)>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    principal.require_any_role(STAFF_ROLES)?;
    let item = state.catalog.create::<T>(draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace the editable fields of a record of kind `T`.
///
/// # Errors
///
/// 403 for non-staff callers, 404 when the record is unknown or deleted.
pub async fn update<T>(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<StockItemId>,
    Json(draft): Json<T::Draft>,
) -> ApiResult<Json<T>>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    principal.require_any_role(STAFF_ROLES)?;
    Ok(Json(state.catalog.update::<T>(id, draft).await?))
}

/// Soft-delete a record of kind `T`.
///
/// # Errors
///
/// 403 for non-staff callers, 404 when the record is unknown or already
/// deleted.
pub async fn delete<T>(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<StockItemId>,
) -> ApiResult<StatusCode>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    principal.require_any_role(STAFF_ROLES)?;
    state.catalog.delete::<T>(id, caller(&principal)).await?;
    Ok(StatusCode::NO_CONTENT)
}
