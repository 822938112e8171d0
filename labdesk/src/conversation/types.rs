//! Conversation thread attached to a request.

use crate::types::{ConversationId, MessageId, RequestId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message id
    pub id: MessageId,
    /// Author
    pub owner: UserId,
    /// Body
    pub text: String,
    /// Users who have read it
    #[serde(default)]
    pub read_by: Vec<UserId>,
    /// Users whose client has received it
    #[serde(default)]
    pub delivered_to: Vec<UserId>,
    /// When it was sent
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A new message from `owner`. The author has read and received it by
    /// definition.
    #[must_use]
    pub fn new(owner: UserId, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            owner,
            text,
            read_by: vec![owner],
            delivered_to: vec![owner],
            created_at: now,
        }
    }
}

/// Per-user mark applied to a batch of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageMark {
    /// Read, which implies delivered
    Read,
    /// Received by the user's client
    Delivered,
}

/// Append-only message log for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id
    pub id: ConversationId,
    /// Request this thread belongs to (also the real-time room)
    pub request_id: RequestId,
    /// Messages in send order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Open an empty conversation for `request_id`.
    #[must_use]
    pub fn open(request_id: RequestId, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            request_id,
            messages: Vec::new(),
            created_at: now,
        }
    }

    /// Append a message at the end of the thread.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Apply `mark` for `user` to `ids`. Returns the ids whose state changed.
    pub fn apply_mark(
        &mut self,
        mark: MessageMark,
        user: UserId,
        ids: &[MessageId],
    ) -> Vec<MessageId> {
        match mark {
            MessageMark::Read => self.mark_read(user, ids),
            MessageMark::Delivered => self.mark_delivered(user, ids),
        }
    }

    /// Mark `ids` as read by `user`. Returns the ids whose state changed.
    ///
    /// Unknown ids are ignored. A read message is also delivered.
    pub fn mark_read(&mut self, user: UserId, ids: &[MessageId]) -> Vec<MessageId> {
        let mut changed = Vec::new();
        for message in self.messages.iter_mut().filter(|m| ids.contains(&m.id)) {
            let mut touched = false;
            if !message.read_by.contains(&user) {
                message.read_by.push(user);
                touched = true;
            }
            if !message.delivered_to.contains(&user) {
                message.delivered_to.push(user);
                touched = true;
            }
            if touched {
                changed.push(message.id);
            }
        }
        changed
    }

    /// Mark `ids` as delivered to `user`. Returns the ids whose state changed.
    pub fn mark_delivered(&mut self, user: UserId, ids: &[MessageId]) -> Vec<MessageId> {
        let mut changed = Vec::new();
        for message in self.messages.iter_mut().filter(|m| ids.contains(&m.id)) {
            if !message.delivered_to.contains(&user) {
                message.delivered_to.push(user);
                changed.push(message.id);
            }
        }
        changed
    }

    /// Number of messages `user` has not read yet.
    #[must_use]
    pub fn unread_count(&self, user: UserId) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.read_by.contains(&user))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labdesk_testing::epoch;

    fn posted(conversation: &mut Conversation) -> MessageId {
        let message = Message::new(UserId::new(), "hi".to_string(), epoch());
        let id = message.id;
        conversation.append(message);
        id
    }

    #[test]
    fn author_has_read_own_message() {
        let mut conversation = Conversation::open(RequestId::new(), epoch());
        let author = UserId::new();

        let message = Message::new(author, "hi".to_string(), epoch());
        conversation.append(message.clone());

        assert_eq!(message.read_by, vec![author]);
        assert_eq!(conversation.unread_count(author), 0);
        assert_eq!(conversation.unread_count(UserId::new()), 1);
    }

    #[test]
    fn reading_twice_changes_nothing_the_second_time() {
        let mut conversation = Conversation::open(RequestId::new(), epoch());
        let id = posted(&mut conversation);
        let reader = UserId::new();

        assert_eq!(conversation.mark_read(reader, &[id]), vec![id]);
        assert!(conversation.mark_read(reader, &[id]).is_empty());
        assert!(conversation.messages[0].delivered_to.contains(&reader));
    }

    #[test]
    fn delivery_does_not_imply_read() {
        let mut conversation = Conversation::open(RequestId::new(), epoch());
        let id = posted(&mut conversation);
        let reader = UserId::new();

        assert_eq!(conversation.mark_delivered(reader, &[id]), vec![id]);
        assert_eq!(conversation.unread_count(reader), 1);
    }

    #[test]
    fn apply_mark_dispatches_on_the_mark() {
        let mut conversation = Conversation::open(RequestId::new(), epoch());
        let id = posted(&mut conversation);
        let peer = UserId::new();

        assert_eq!(conversation.apply_mark(MessageMark::Delivered, peer, &[id]), vec![id]);
        assert_eq!(conversation.unread_count(peer), 1);
        assert_eq!(conversation.apply_mark(MessageMark::Read, peer, &[id]), vec![id]);
        assert_eq!(conversation.unread_count(peer), 0);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut conversation = Conversation::open(RequestId::new(), epoch());
        posted(&mut conversation);

        assert!(conversation
            .mark_read(UserId::new(), &[MessageId::new()])
            .is_empty());
    }
}
