//! Storage seams.
//!
//! Every collection sits behind an object-safe async trait so services can be
//! wired against the in-memory implementations in [`crate::mocks`] or the
//! `PostgreSQL` ones in [`crate::stores::postgres`].
//!
//! Implementations report failures as [`LabError::Storage`] with the
//! operation and target id in the message.
//!
//! [`LabError::Storage`]: crate::error::LabError::Storage

use crate::conversation::{Conversation, Message, MessageMark};
use crate::error::Result;
use crate::registration::{RegisterToken, User};
use crate::request::{Request, RequestStatus};
use crate::types::{ConversationId, MessageId, RegisterTokenId, RequestId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::stock::StockRegistry;

/// Storage for lab requests.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Reserve the next request number.
    async fn next_number(&self) -> Result<i64>;

    /// Insert a new request.
    async fn insert(&self, request: &Request) -> Result<()>;

    /// Fetch one request, soft-deleted ones included. Absence is `Ok(None)`.
    async fn get(&self, id: RequestId) -> Result<Option<Request>>;

    /// Save `request` if the stored copy is still at `request.version`.
    ///
    /// The stored copy gets `request.version + 1`, which is returned.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`](crate::error::LabError::NotFound) when no
    ///   request has this id
    /// - [`LabError::Conflict`](crate::error::LabError::Conflict) when another
    ///   writer saved it first; nothing is written
    async fn update(&self, request: &Request) -> Result<i64>;

    /// Live requests, optionally restricted to one status, highest number
    /// first.
    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>>;
}

/// Storage for conversations.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation.
    async fn insert(&self, conversation: &Conversation) -> Result<()>;

    /// Fetch one conversation. Absence is `Ok(None)`.
    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>>;

    /// Append `message` to the end of the thread in one write.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`](crate::error::LabError::NotFound) when the
    /// conversation does not exist.
    async fn append_message(&self, id: ConversationId, message: &Message) -> Result<()>;

    /// Apply `mark` for `user` to the messages in `ids` in one
    /// read-modify-write that no other writer can interleave with.
    /// Returns the ids whose state changed.
    ///
    /// # Errors
    ///
    /// [`LabError::NotFound`](crate::error::LabError::NotFound) when the
    /// conversation does not exist.
    async fn mark_messages(
        &self,
        id: ConversationId,
        user: UserId,
        ids: &[MessageId],
        mark: MessageMark,
    ) -> Result<Vec<MessageId>>;
}

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch one user. Absence is `Ok(None)`.
    async fn get(&self, id: UserId) -> Result<Option<User>>;

    /// Look a user up by (normalised) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a user outside the registration flow (admin bootstrap).
    ///
    /// # Errors
    ///
    /// [`LabError::Validation`](crate::error::LabError::Validation) when the
    /// email is taken.
    async fn insert(&self, user: &User) -> Result<()>;
}

/// Storage for registration tokens.
#[async_trait]
pub trait RegisterTokenRepository: Send + Sync {
    /// Insert a new token.
    async fn insert(&self, token: &RegisterToken) -> Result<()>;

    /// Fetch one token. Absence is `Ok(None)`.
    async fn get(&self, id: RegisterTokenId) -> Result<Option<RegisterToken>>;

    /// Overwrite an existing token.
    async fn update(&self, token: &RegisterToken) -> Result<()>;
}

/// The one transactional primitive: create a user and consume a token as a
/// single atomic step.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert `user` and mark `token` consumed by it.
    ///
    /// The token's availability is re-checked inside the transaction, so of
    /// several concurrent redeems of one token exactly one succeeds.
    ///
    /// # Errors
    ///
    /// - [`LabError::NotFound`](crate::error::LabError::NotFound): token unknown
    /// - [`LabError::TokenUnavailable`](crate::error::LabError::TokenUnavailable):
    ///   consumed or revoked by the time the transaction ran
    /// - [`LabError::Validation`](crate::error::LabError::Validation): email taken
    /// - [`LabError::Storage`](crate::error::LabError::Storage): the
    ///   transaction failed and was rolled back
    async fn redeem(&self, token: RegisterTokenId, user: &User, now: DateTime<Utc>) -> Result<()>;
}
