//! Periodic expiration sweep.
//!
//! Expiration is always applied when a request is read; the sweep also
//! rejects stale requests nobody reads. Disabled when the interval is 0.

use crate::request::RequestService;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the sweep loop. Returns `None` when `interval_secs` is 0.
#[must_use]
pub fn spawn_expiration_sweep(
    requests: RequestService,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::debug!("Expiration sweep disabled");
        return None;
    }

    tracing::info!(interval_secs, "Starting expiration sweep");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = requests.sweep_expired().await {
                tracing::error!(error = %e, "Expiration sweep failed");
            }
        }
    }))
}
