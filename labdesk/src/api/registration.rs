//! Registration endpoints.
//!
//! - `POST /api/register-tokens` - Issue a token (admin)
//! - `GET /api/register-tokens/:id` - Inspect a token (admin)
//! - `DELETE /api/register-tokens/:id` - Revoke an unused token (admin)
//! - `POST /api/register` - Redeem a token; the token id is the credential

use super::{caller, ApiResult, ADMIN_ROLES};
use crate::registration::{NewUser, RegisterToken, User};
use crate::server::state::AppState;
use crate::types::{RegisterTokenId, Role};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use labdesk_web::Principal;
use serde::Deserialize;

/// Body of a token issue call.
#[derive(Debug, Deserialize)]
pub struct IssueTokenBody {
    /// Email the token is reserved for
    #[serde(default)]
    pub email: Option<String>,
    /// Role granted on registration
    pub role: Role,
}

/// Body of a registration.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    /// Token being redeemed
    pub token: RegisterTokenId,
    /// Account details
    #[serde(flatten)]
    pub user: NewUser,
}

/// Issue a token.
///
/// # Errors
///
/// 403 for non-admins, 400 for a malformed email.
pub async fn issue_token(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<IssueTokenBody>,
) -> ApiResult<(StatusCode, Json<RegisterToken>)> {
    principal.require_any_role(ADMIN_ROLES)?;
    let token = state
        .registration
        .issue_token(caller(&principal), body.email, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// Inspect a token.
///
/// # Errors
///
/// 403 for non-admins, 404 when unknown.
pub async fn get_token(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RegisterTokenId>,
) -> ApiResult<Json<RegisterToken>> {
    principal.require_any_role(ADMIN_ROLES)?;
    Ok(Json(state.registration.get_token(id).await?))
}

/// Revoke a token.
///
/// # Errors
///
/// 403 for non-admins, 404 when unknown or revoked, 400 when consumed.
pub async fn revoke_token(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RegisterTokenId>,
) -> ApiResult<Json<RegisterToken>> {
    principal.require_any_role(ADMIN_ROLES)?;
    Ok(Json(
        state
            .registration
            .revoke_token(id, caller(&principal))
            .await?,
    ))
}

/// Redeem a token and create the account.
///
/// # Errors
///
/// 404 for an unknown token; 400 when it is spent, reserved for another
/// email, or the email is malformed or taken.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.registration.register(body.token, body.user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
