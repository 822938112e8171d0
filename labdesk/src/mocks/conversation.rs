//! In-memory conversation repository.

use super::{lock, FailureSwitch};
use crate::conversation::{Conversation, Message, MessageMark};
use crate::error::{LabError, Result};
use crate::providers::ConversationRepository;
use crate::types::{ConversationId, MessageId, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Conversation repository over a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryConversationRepository {
    conversations: Arc<Mutex<HashMap<ConversationId, Conversation>>>,
    failure: FailureSwitch,
}

impl InMemoryConversationRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `cause`.
    pub fn fail_with(&self, cause: impl Into<String>) {
        self.failure.set(cause);
    }

    /// Stop failing.
    pub fn recover(&self) {
        self.failure.clear();
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn insert(&self, conversation: &Conversation) -> Result<()> {
        let operation = format!("insert conversation {}", conversation.id);
        self.failure.check(|| operation.clone())?;
        lock(&self.conversations, &operation)?.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let operation = format!("load conversation {id}");
        self.failure.check(|| operation.clone())?;
        Ok(lock(&self.conversations, &operation)?.get(&id).cloned())
    }

    async fn append_message(&self, id: ConversationId, message: &Message) -> Result<()> {
        let operation = format!("append message to conversation {id}");
        self.failure.check(|| operation.clone())?;
        lock(&self.conversations, &operation)?
            .get_mut(&id)
            .ok_or_else(|| LabError::not_found("Conversation", id))?
            .append(message.clone());
        Ok(())
    }

    async fn mark_messages(
        &self,
        id: ConversationId,
        user: UserId,
        ids: &[MessageId],
        mark: MessageMark,
    ) -> Result<Vec<MessageId>> {
        let operation = format!("mark messages in conversation {id}");
        self.failure.check(|| operation.clone())?;
        let changed = lock(&self.conversations, &operation)?
            .get_mut(&id)
            .ok_or_else(|| LabError::not_found("Conversation", id))?
            .apply_mark(mark, user, ids);
        Ok(changed)
    }
}
