//! Labdesk - lab resource requests.
//!
//! Lab members ask for equipment, materials and reactives for a session;
//! staff review, approve and complete the requests. Each request carries a
//! conversation thread with real-time fan-out, and accounts are created
//! through one-time invitation tokens.
//!
//! # Architecture
//!
//! ```text
//!                 ┌───────────────────────┐
//!  HTTP / WS ───▶ │  api (axum handlers)  │
//!                 └───────────────────────┘
//!                    │          │        │
//!                    ▼          ▼        ▼
//!   ┌────────────────────┐ ┌──────────────┐ ┌──────────────┐
//!   │  RequestService    │ │ Conversation │ │ Registration │
//!   │  (RequestReducer)  │ │   Service    │ │   Service    │
//!   └────────────────────┘ └──────────────┘ └──────────────┘
//!        │          │             │               │
//!        ▼          ▼             ▼               ▼
//!   Availability  RoomBroadcaster ◀┘       RegistrationStore
//!     Checker                                (transaction)
//!        │
//!        ▼
//!   StockRegistry<Equipment | Material | Reactive>
//! ```
//!
//! # Key Rules
//!
//! ## Availability check order
//!
//! Equipment, then materials, then reactives. The first group that cannot be
//! served decides the reason (`"Equipment unavailable"`), and later groups
//! are never fetched. An empty group always passes; a request with no lines
//! at all is refused before any registry access.
//!
//! ## Expiration
//!
//! A `PENDING`/`APPROVED` request older than `REQUEST_TTL_IN_DAYS` is
//! rejected the next time it is read individually (and by the optional
//! sweep). Listing never expires anything.
//!
//! ## Stock is not reserved
//!
//! The checker only reads stock. Two concurrent requests for the last unit
//! can both be admitted.

#![forbid(unsafe_code)]

pub mod api;
pub mod availability;
pub mod broadcast;
pub mod config;
pub mod conversation;
pub mod error;
pub mod metrics;
pub mod mocks;
pub mod providers;
pub mod registration;
pub mod request;
pub mod server;
pub mod stock;
pub mod stores;
pub mod types;

pub use error::{LabError, Result};
