//! User registration through one-time invitation tokens.
//!
//! An administrator issues a [`RegisterToken`]; the invitee redeems it once.
//! Redeeming creates the user and consumes the token in a single
//! [`RegistrationStore::redeem`](crate::providers::RegistrationStore::redeem)
//! call, so two concurrent redeems of one token yield exactly one account.

pub mod service;
pub mod types;

pub use service::RegistrationService;
pub use types::{normalize_email, NewUser, RegisterToken, User};
