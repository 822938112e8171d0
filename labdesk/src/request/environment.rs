//! Environment for the request lifecycle reducer.

use crate::broadcast::RoomBroadcaster;
use labdesk_core::environment::Clock;
use std::sync::Arc;

/// Dependencies injected into [`RequestReducer`](super::RequestReducer).
///
/// Production uses `SystemClock` and the channel broadcaster; tests use
/// `FixedClock`/`ManualClock` and a recording broadcaster.
#[derive(Clone)]
pub struct RequestEnvironment {
    clock: Arc<dyn Clock>,
    broadcaster: Arc<dyn RoomBroadcaster>,
    ttl_seconds: i64,
}

impl RequestEnvironment {
    /// Create a new environment.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        broadcaster: Arc<dyn RoomBroadcaster>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            clock,
            broadcaster,
            ttl_seconds,
        }
    }

    /// Clock for getting current time.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Room fan-out for status notifications.
    #[must_use]
    pub fn broadcaster(&self) -> Arc<dyn RoomBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Request time-to-live in seconds.
    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}
