//! Conversation storage.

use super::{decode, encode};
use crate::conversation::{Conversation, Message, MessageMark};
use crate::error::{LabError, Result};
use crate::providers::ConversationRepository;
use crate::types::{ConversationId, MessageId, UserId};
use async_trait::async_trait;
use sqlx::types::JsonValue;
use sqlx::PgPool;

/// `PostgreSQL` conversation repository.
#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    /// Create a repository on `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn insert(&self, conversation: &Conversation) -> Result<()> {
        let operation = format!("insert conversation {}", conversation.id);
        let data = encode(conversation, &operation)?;

        sqlx::query("INSERT INTO conversations (id, request_id, data) VALUES ($1, $2, $3)")
            .bind(conversation.id.as_uuid())
            .bind(conversation.request_id.as_uuid())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;
        Ok(())
    }

    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let operation = format!("load conversation {id}");
        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM conversations WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;

        row.map(|(json,)| decode(json, &operation)).transpose()
    }

    /// Appends inside the database with `jsonb_set`, so concurrent appends
    /// never read each other's documents.
    async fn append_message(&self, id: ConversationId, message: &Message) -> Result<()> {
        let operation = format!("append message to conversation {id}");
        let message = encode(message, &operation)?;

        let result = sqlx::query(
            r"
            UPDATE conversations
            SET data = jsonb_set(
                data,
                '{messages}',
                COALESCE(data->'messages', '[]'::jsonb) || jsonb_build_array($2::jsonb)
            )
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::storage(&operation, e))?;

        if result.rows_affected() == 0 {
            return Err(LabError::not_found("Conversation", id));
        }
        Ok(())
    }

    /// `BEGIN`, lock the conversation row, apply the mark, write back,
    /// `COMMIT`.
    async fn mark_messages(
        &self,
        id: ConversationId,
        user: UserId,
        ids: &[MessageId],
        mark: MessageMark,
    ) -> Result<Vec<MessageId>> {
        let operation = format!("mark messages in conversation {id}");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM conversations WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| LabError::storage(&operation, e))?;

        let mut conversation: Conversation = row
            .map(|(json,)| decode(json, &operation))
            .transpose()?
            .ok_or_else(|| LabError::not_found("Conversation", id))?;

        let changed = conversation.apply_mark(mark, user, ids);
        if changed.is_empty() {
            return Ok(changed);
        }

        sqlx::query("UPDATE conversations SET data = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(encode(&conversation, &operation)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| LabError::storage(&operation, e))?;

        tx.commit()
            .await
            .map_err(|e| LabError::storage(&operation, e))?;
        Ok(changed)
    }
}
