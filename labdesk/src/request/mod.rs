//! Lab request lifecycle.
//!
//! # Architecture
//!
//! ```text
//! create/update ──▶ empty check ──▶ AvailabilityChecker ──▶ persist (PENDING)
//!
//! approve/reject/complete/assign/delete
//!        │
//!        ▼
//!   get (expiration applied) ──▶ RequestReducer ──▶ persist ──▶ run effects
//!                                                               (room event)
//! ```
//!
//! Status changes are decided by [`RequestReducer`], a pure function over
//! [`RequestState`]; [`RequestService`] is the shell that loads, persists and
//! runs effects. Expiration is evaluated lazily on every single-request read
//! and, when configured, by a periodic sweep.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod service;
pub mod types;

pub use actions::RequestAction;
pub use environment::RequestEnvironment;
pub use reducer::{RequestReducer, STATUS_EVENT};
pub use service::RequestService;
pub use types::{
    validate_amounts, NewRequest, ReactiveLine, Request, RequestPatch, RequestState,
    RequestStatus, EXPIRED_REASON,
};
