//! Custom Axum extractors.
//!
//! - `CorrelationId`: the id assigned by `request_trace_layer` (or a fresh one)
//! - `Principal`: the authenticated caller, as vouched for by the gateway
//!
//! Authentication itself happens upstream. The gateway validates the session
//! and forwards the caller's id and roles in trusted headers; handlers take the
//! principal at face value.

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the comma-separated role list of the authenticated user.
pub const ROLES_HEADER: &str = "X-User-Roles";

/// Correlation ID for request tracing.
///
/// Prefers the id stored in the request extensions by the middleware, then
/// the `X-Correlation-ID` header, then a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User id issued by the identity provider
    pub user_id: Uuid,
    /// Lower-cased role names (`admin`, `staff`, `member`, ...)
    pub roles: Vec<String>,
}

impl Principal {
    /// Build a principal directly (tests, background jobs).
    #[must_use]
    pub fn new(user_id: Uuid, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            user_id,
            roles: roles
                .into_iter()
                .map(|role| role.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the caller holds at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Reject with 403 unless the caller holds one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::forbidden` naming the accepted roles.
    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AppError> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "one of the roles [{}] is required",
                roles.join(", ")
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("missing authenticated user"))?
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::unauthorized("malformed authenticated user id"))?;

        let roles = parts
            .headers
            .get(ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Self::new(user_id, roles))
    }
}
