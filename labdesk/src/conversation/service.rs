//! Conversation operations and their real-time fan-out.

use super::{Conversation, Message, MessageMark};
use crate::broadcast::{RoomBroadcaster, RoomEvent};
use crate::error::{LabError, Result};
use crate::metrics;
use crate::providers::{ConversationRepository, UserRepository};
use crate::types::{ConversationId, MessageId, RequestId, UserId};
use labdesk_core::environment::Clock;
use serde_json::json;
use std::sync::Arc;

/// Room event published when a message is appended.
pub const MESSAGE_ADDED: &str = "message.added";
/// Room event published when messages are marked read.
pub const MESSAGES_READ: &str = "messages.read";
/// Room event published when messages are marked delivered.
pub const MESSAGES_DELIVERED: &str = "messages.delivered";

/// Reads and writes request conversations.
#[derive(Clone)]
pub struct ConversationService {
    conversations: Arc<dyn ConversationRepository>,
    users: Arc<dyn UserRepository>,
    broadcaster: Arc<dyn RoomBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    /// Create the service.
    #[must_use]
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        users: Arc<dyn UserRepository>,
        broadcaster: Arc<dyn RoomBroadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversations,
            users,
            broadcaster,
            clock,
        }
    }

    /// Open the conversation of a new request.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn open(&self, request_id: RequestId) -> Result<Conversation> {
        let conversation = Conversation::open(request_id, self.clock.now());
        self.conversations.insert(&conversation).await?;
        tracing::debug!(conversation_id = %conversation.id, %request_id, "Conversation opened");
        Ok(conversation)
    }

    /// Fetch a conversation.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`] when it does not exist.
    pub async fn get(&self, id: ConversationId) -> Result<Conversation> {
        self.conversations
            .get(id)
            .await?
            .ok_or_else(|| LabError::not_found("Conversation", id))
    }

    /// Append a message from `owner`.
    ///
    /// # Errors
    ///
    /// - [`LabError::Validation`] when the conversation or the user does not
    ///   exist, or the text is blank
    /// - [`LabError::Storage`] on persistence failure
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub async fn add_message(
        &self,
        conversation_id: ConversationId,
        owner: UserId,
        text: String,
    ) -> Result<Message> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LabError::Validation("Message text must not be empty".to_string()));
        }

        let conversation = self.existing(conversation_id).await?;

        if self.users.get(owner).await?.is_none() {
            tracing::warn!(%owner, "Message from unknown user");
            return Err(LabError::Validation(format!("User {owner} does not exist")));
        }

        let message = Message::new(owner, text, self.clock.now());
        self.conversations
            .append_message(conversation.id, &message)
            .await?;
        metrics::record_message();

        self.broadcaster
            .publish(RoomEvent::for_request(
                conversation.request_id,
                Some(owner),
                MESSAGE_ADDED,
                json!({
                    "conversation_id": conversation.id,
                    "message": message,
                }),
            ))
            .await;

        Ok(message)
    }

    /// Mark `ids` as read by `user`. Returns the ids that changed.
    ///
    /// # Errors
    ///
    /// - [`LabError::Validation`] when the conversation does not exist
    /// - [`LabError::Storage`] on persistence failure
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn read_messages(
        &self,
        conversation_id: ConversationId,
        user: UserId,
        ids: Vec<MessageId>,
    ) -> Result<Vec<MessageId>> {
        self.mark(conversation_id, user, &ids, MessageMark::Read).await
    }

    /// Mark `ids` as delivered to `user`. Returns the ids that changed.
    ///
    /// # Errors
    ///
    /// - [`LabError::Validation`] when the conversation does not exist
    /// - [`LabError::Storage`] on persistence failure
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn deliver_messages(
        &self,
        conversation_id: ConversationId,
        user: UserId,
        ids: Vec<MessageId>,
    ) -> Result<Vec<MessageId>> {
        self.mark(conversation_id, user, &ids, MessageMark::Delivered).await
    }

    async fn existing(&self, id: ConversationId) -> Result<Conversation> {
        self.conversations
            .get(id)
            .await?
            .ok_or_else(|| LabError::Validation(format!("Conversation {id} does not exist")))
    }

    async fn mark(
        &self,
        conversation_id: ConversationId,
        user: UserId,
        ids: &[MessageId],
        mark: MessageMark,
    ) -> Result<Vec<MessageId>> {
        let conversation = self.existing(conversation_id).await?;
        let changed = self
            .conversations
            .mark_messages(conversation.id, user, ids, mark)
            .await?;
        if changed.is_empty() {
            return Ok(changed);
        }

        let kind = match mark {
            MessageMark::Read => MESSAGES_READ,
            MessageMark::Delivered => MESSAGES_DELIVERED,
        };
        self.broadcaster
            .publish(RoomEvent::for_request(
                conversation.request_id,
                Some(user),
                kind,
                json!({
                    "conversation_id": conversation.id,
                    "user": user,
                    "message_ids": changed,
                }),
            ))
            .await;
        Ok(changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::{InMemoryAccounts, InMemoryConversationRepository, RecordingBroadcaster};
    use crate::registration::User;
    use crate::types::{Deletion, Role};
    use labdesk_testing::{epoch, test_clock};

    struct Fixture {
        service: ConversationService,
        conversations: Arc<InMemoryConversationRepository>,
        broadcaster: Arc<RecordingBroadcaster>,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let accounts = Arc::new(InMemoryAccounts::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let user = User {
            id: UserId::new(),
            email: "ada@lab.example".to_string(),
            name: "Ada".to_string(),
            role: Role::Member,
            created_at: epoch(),
            deletion: Deletion::Active,
        };
        UserRepository::insert(accounts.as_ref(), &user).await.unwrap();

        let service = ConversationService::new(
            conversations.clone(),
            accounts,
            broadcaster.clone(),
            Arc::new(test_clock()),
        );
        Fixture {
            service,
            conversations,
            broadcaster,
            user: user.id,
        }
    }

    #[tokio::test]
    async fn add_message_appends_and_broadcasts() {
        let f = fixture().await;
        let request_id = RequestId::new();
        let conversation = f.service.open(request_id).await.unwrap();

        let message = f
            .service
            .add_message(conversation.id, f.user, "  Is the centrifuge free?  ".to_string())
            .await
            .unwrap();

        assert_eq!(message.text, "Is the centrifuge free?");
        let stored = f.service.get(conversation.id).await.unwrap();
        assert_eq!(stored.messages, vec![message]);

        let events = f.broadcaster.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].room, request_id.to_string());
        assert_eq!(events[0].kind, MESSAGE_ADDED);
        assert_eq!(events[0].origin, Some(f.user));
    }

    #[tokio::test]
    async fn missing_conversation_is_a_business_error() {
        let f = fixture().await;

        let err = f
            .service
            .add_message(ConversationId::new(), f.user, "hello".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, LabError::Validation(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn unknown_user_is_a_business_error() {
        let f = fixture().await;
        let conversation = f.service.open(RequestId::new()).await.unwrap();

        let err = f
            .service
            .add_message(conversation.id, UserId::new(), "hello".to_string())
            .await
            .unwrap_err();

        assert!(matches!(err, LabError::Validation(_)));
    }

    #[tokio::test]
    async fn storage_failure_is_infrastructure() {
        let f = fixture().await;
        let conversation = f.service.open(RequestId::new()).await.unwrap();
        f.conversations.fail_with("disk full");

        let err = f
            .service
            .add_message(conversation.id, f.user, "hello".to_string())
            .await
            .unwrap_err();

        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn read_messages_announces_only_changes() {
        let f = fixture().await;
        let conversation = f.service.open(RequestId::new()).await.unwrap();
        let message = f
            .service
            .add_message(conversation.id, f.user, "hello".to_string())
            .await
            .unwrap();
        let reader = UserId::new();

        let changed = f
            .service
            .read_messages(conversation.id, reader, vec![message.id])
            .await
            .unwrap();
        assert_eq!(changed, vec![message.id]);

        let again = f
            .service
            .read_messages(conversation.id, reader, vec![message.id])
            .await
            .unwrap();
        assert!(again.is_empty());

        let kinds: Vec<_> = f.broadcaster.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![MESSAGE_ADDED, MESSAGES_READ]);
    }

    #[tokio::test]
    async fn deliver_messages_marks_delivery() {
        let f = fixture().await;
        let conversation = f.service.open(RequestId::new()).await.unwrap();
        let message = f
            .service
            .add_message(conversation.id, f.user, "hello".to_string())
            .await
            .unwrap();
        let peer = UserId::new();

        f.service
            .deliver_messages(conversation.id, peer, vec![message.id])
            .await
            .unwrap();

        let stored = f.service.get(conversation.id).await.unwrap();
        assert!(stored.messages[0].delivered_to.contains(&peer));
        assert!(!stored.messages[0].read_by.contains(&peer));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_messages_are_all_kept() {
        let f = fixture().await;
        let id = f.service.open(RequestId::new()).await.unwrap().id;

        let senders: Vec<_> = (0..200)
            .map(|i| {
                let service = f.service.clone();
                let user = f.user;
                tokio::spawn(async move {
                    service
                        .add_message(id, user, format!("message {i}"))
                        .await
                })
            })
            .collect();
        for sender in senders {
            sender.await.unwrap().unwrap();
        }

        let stored = f.service.get(id).await.unwrap();
        assert_eq!(stored.messages.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_read_marks_are_all_kept() {
        let f = fixture().await;
        let id = f.service.open(RequestId::new()).await.unwrap().id;
        let message_id = f
            .service
            .add_message(id, f.user, "hello".to_string())
            .await
            .unwrap()
            .id;

        let readers: Vec<UserId> = (0..50).map(|_| UserId::new()).collect();
        let marks: Vec<_> = readers
            .iter()
            .map(|&reader| {
                let service = f.service.clone();
                tokio::spawn(async move {
                    service
                        .read_messages(id, reader, vec![message_id])
                        .await
                })
            })
            .collect();
        for mark in marks {
            assert_eq!(mark.await.unwrap().unwrap(), vec![message_id]);
        }

        let stored = f.service.get(id).await.unwrap();
        for reader in readers {
            assert!(stored.messages[0].read_by.contains(&reader));
        }
    }
}
