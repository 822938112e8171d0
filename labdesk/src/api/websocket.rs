//! Real-time room endpoint.
//!
//! ```text
//! GET /ws/requests/:id        (X-User-Id / X-User-Roles as for every call)
//! ```
//!
//! The connection joins the room of request `:id` and receives every
//! [`RoomEvent`] published there as a JSON text frame, except events the
//! caller caused. Inbound frames other than `Close` are ignored. The room is
//! closed when its last connection leaves.
//!
//! ```json
//! {"room":"550e8400-…","origin":"…","kind":"message.added","payload":{…}}
//! ```

use super::{caller, requests::visible_request, ApiResult};
use crate::broadcast::{ChannelBroadcaster, RoomEvent};
use crate::server::state::AppState;
use crate::types::{RequestId, UserId};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use labdesk_web::Principal;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Duration};

/// Open WebSocket connections.
static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Ping interval for keep-alive.
const PING_INTERVAL_SECS: u64 = 30;

/// Join the room of one request.
///
/// # Errors
///
/// 404 when the request does not exist, 403 when the caller is not a
/// participant. Both are decided before the upgrade.
pub async fn request_room(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<RequestId>,
) -> ApiResult<Response> {
    visible_request(&state, &principal, id).await?;
    let user = caller(&principal);
    let rooms = state.rooms.clone();
    let events = rooms.subscribe(id.to_string()).await;

    Ok(ws.on_upgrade(move |socket| serve_room(socket, rooms, id, user, events)))
}

async fn serve_room(
    socket: WebSocket,
    rooms: ChannelBroadcaster,
    request: RequestId,
    user: UserId,
    mut events: tokio::sync::broadcast::Receiver<RoomEvent>,
) {
    let total = ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::info!(%request, %user, total_connections = total, "Joined request room");

    let (mut sender, mut receiver) = socket.split();
    let mut ping = interval(Duration::from_secs(PING_INTERVAL_SECS));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.is_visible_to(user) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize room event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%request, %user, skipped, "Room receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    rooms.leave(&request.to_string(), events).await;
    let remaining = ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed) - 1;
    tracing::info!(%request, %user, total_connections = remaining, "Left request room");
}
