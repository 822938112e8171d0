//! Real-time room fan-out.
//!
//! Every lab request has a room named after its id. Services publish
//! [`RoomEvent`]s into the room; the WebSocket endpoint subscribes to it and
//! forwards events to every connected participant except the one that caused
//! them.
//!
//! Room membership lives entirely in the transport: a room exists while at
//! least one receiver is subscribed to it, and events published to an empty
//! room are dropped.

use crate::types::{RequestId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Capacity of each room channel. Slow receivers that fall further behind
/// than this see `RecvError::Lagged` and skip ahead.
const ROOM_CHANNEL_CAPACITY: usize = 256;

/// One event delivered to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Room (request id) the event belongs to
    pub room: String,
    /// User whose action produced the event; not echoed back to them
    pub origin: Option<UserId>,
    /// Event name (`message.added`, `messages.read`, ...)
    pub kind: String,
    /// Event body
    pub payload: serde_json::Value,
}

impl RoomEvent {
    /// Build an event for the room of `request`.
    #[must_use]
    pub fn for_request(
        request: RequestId,
        origin: Option<UserId>,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            room: request.to_string(),
            origin,
            kind: kind.into(),
            payload,
        }
    }

    /// Whether `user` should receive this event.
    #[must_use]
    pub fn is_visible_to(&self, user: UserId) -> bool {
        self.origin != Some(user)
    }
}

/// Sink for room events.
#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    /// Deliver `event` to the participants of `event.room`.
    ///
    /// Publishing never fails: a room with nobody listening simply drops the
    /// event.
    async fn publish(&self, event: RoomEvent);
}

type RoomsMap = Arc<RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>>;

/// Room broadcaster backed by one tokio `broadcast` channel per room.
#[derive(Clone, Default)]
pub struct ChannelBroadcaster {
    rooms: RoomsMap,
}

impl ChannelBroadcaster {
    /// Create a broadcaster with no rooms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `room`, creating it if needed.
    pub async fn subscribe(&self, room: impl Into<String>) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.into())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Leave `room`, closing it when `receiver` was its last participant.
    pub async fn leave(&self, room: &str, receiver: broadcast::Receiver<RoomEvent>) {
        drop(receiver);
        let mut rooms = self.rooms.write().await;
        if rooms.get(room).is_some_and(|sender| sender.receiver_count() == 0) {
            rooms.remove(room);
            tracing::debug!(%room, "Closed empty room");
        }
    }

    /// Number of rooms that currently exist.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomBroadcaster for ChannelBroadcaster {
    async fn publish(&self, event: RoomEvent) {
        let mut rooms = self.rooms.write().await;
        let Some(sender) = rooms.get(&event.room) else {
            tracing::trace!(room = %event.room, kind = %event.kind, "No participants in room");
            return;
        };

        let room = event.room.clone();
        if sender.send(event).is_err() {
            // Every receiver has gone away since the last publish.
            rooms.remove(&room);
            tracing::debug!(room = %room, "Closed empty room");
        }
    }
}
