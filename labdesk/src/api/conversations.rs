//! Conversation endpoints.
//!
//! - `GET /api/conversations/:id` - The thread with every message
//! - `POST /api/conversations/:id/messages` - Post as the caller
//! - `POST /api/conversations/:id/read` - Mark messages read by the caller
//! - `POST /api/conversations/:id/delivered` - Mark messages delivered
//!
//! Only staff and the requester of the underlying request take part.

use super::{caller, is_staff, requests::visible_request, ApiResult};
use crate::conversation::{Conversation, Message};
use crate::error::LabError;
use crate::server::state::AppState;
use crate::types::{ConversationId, MessageId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use labdesk_web::Principal;
use serde::{Deserialize, Serialize};

/// Body of a new message.
#[derive(Debug, Deserialize)]
pub struct NewMessage {
    /// Message text
    pub text: String,
}

/// Body of read/delivered calls.
#[derive(Debug, Deserialize)]
pub struct MessageIds {
    /// Messages to mark
    pub message_ids: Vec<MessageId>,
}

/// Ids whose state actually changed.
#[derive(Debug, Serialize, Deserialize)]
pub struct Changed {
    /// Changed message ids
    pub changed: Vec<MessageId>,
}

/// Get a conversation.
///
/// # Errors
///
/// 404 when unknown, 403 for outsiders.
pub async fn get(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state.conversations.get(id).await?;
    visible_request(&state, &principal, conversation.request_id).await?;
    Ok(Json(conversation))
}

/// Post a message as the caller.
///
/// # Errors
///
/// 400 when the conversation or the caller's account does not exist or the
/// text is blank.
pub async fn add_message(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
    Json(body): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    ensure_participant(&state, &principal, id).await?;
    let message = state
        .conversations
        .add_message(id, caller(&principal), body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark messages read by the caller.
///
/// # Errors
///
/// 400 when the conversation does not exist.
pub async fn read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
    Json(body): Json<MessageIds>,
) -> ApiResult<Json<Changed>> {
    ensure_participant(&state, &principal, id).await?;
    let changed = state
        .conversations
        .read_messages(id, caller(&principal), body.message_ids)
        .await?;
    Ok(Json(Changed { changed }))
}

/// Mark messages delivered to the caller.
///
/// # Errors
///
/// 400 when the conversation does not exist.
pub async fn delivered(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<ConversationId>,
    Json(body): Json<MessageIds>,
) -> ApiResult<Json<Changed>> {
    ensure_participant(&state, &principal, id).await?;
    let changed = state
        .conversations
        .deliver_messages(id, caller(&principal), body.message_ids)
        .await?;
    Ok(Json(Changed { changed }))
}

/// Staff always pass. A missing conversation passes too, so the service
/// reports it with its own (400) error.
async fn ensure_participant(
    state: &AppState,
    principal: &Principal,
    id: ConversationId,
) -> ApiResult<()> {
    if is_staff(principal) {
        return Ok(());
    }
    match state.conversations.get(id).await {
        Ok(conversation) => {
            visible_request(state, principal, conversation.request_id).await?;
            Ok(())
        }
        Err(LabError::NotFound { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
