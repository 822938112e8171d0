//! Broadcaster that records what it was asked to publish.

use crate::broadcast::{RoomBroadcaster, RoomEvent};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Keeps every published event, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingBroadcaster {
    events: Arc<Mutex<Vec<RoomEvent>>>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far.
    pub fn events(&self) -> Vec<RoomEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RoomBroadcaster for RecordingBroadcaster {
    async fn publish(&self, event: RoomEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
