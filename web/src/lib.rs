//! Axum integration for the labdesk service.
//!
//! The HTTP layer is the imperative shell around the labdesk services: it
//! parses requests, resolves the calling principal, calls a service and maps
//! the outcome to a response.
//!
//! # Request Flow
//!
//! 1. **Correlate**: `request_trace_layer` assigns a correlation id and opens a span
//! 2. **Identify**: the `Principal` extractor reads the identity headers set by the gateway
//! 3. **Dispatch**: the handler calls a service (request lifecycle, stock, conversation)
//! 4. **Map**: domain errors become an `AppError`, rendered as `{code, message}` JSON
//!
//! # Example
//!
//! ```ignore
//! use labdesk_web::{AppError, Principal};
//! use axum::{extract::State, Json};
//!
//! async fn create_request(
//!     State(state): State<AppState>,
//!     principal: Principal,
//!     Json(body): Json<NewRequest>,
//! ) -> Result<Json<Created>, AppError> {
//!     let id = state.requests.create(principal.user_id, body).await?;
//!     Ok(Json(Created { id }))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, Principal, ROLES_HEADER, USER_ID_HEADER};
pub use middleware::{request_trace_layer, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
