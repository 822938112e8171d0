//! HTTP server: state, router and background tasks.

pub mod routes;
pub mod state;
pub mod sweep;

pub use routes::build_router;
pub use state::{AppState, Providers};
pub use sweep::spawn_expiration_sweep;
