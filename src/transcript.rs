//! Transcript persistence
//!
//! Consumed by the engine as a sink: the hosting application appends the
//! user and assistant messages around each core call, and the debate
//! orchestrator appends its phase outputs. `append_all` is the phase-atomic
//! write the debate path relies on — either every message in the batch
//! lands, or none do.

use crate::models::{Candidate, MessageRole, TranscriptMessage};
use crate::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use uuid::Uuid;

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        sources: &[Candidate],
    ) -> Result<()>;

    /// Atomic batch append: all messages or none.
    async fn append_all(&self, messages: Vec<TranscriptMessage>) -> Result<()>;
}

/// In-memory store for development & testing.
pub struct InMemoryTranscriptStore {
    conversations: Arc<RwLock<HashMap<Uuid, Vec<TranscriptMessage>>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn messages(&self, conversation_id: Uuid) -> Vec<TranscriptMessage> {
        let conversations = self.conversations.read().await;
        conversations
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        sources: &[Candidate],
    ) -> Result<()> {
        let message = TranscriptMessage::new(conversation_id, role, content, sources.to_vec());
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(conversation_id)
            .or_insert_with(Vec::new)
            .push(message);
        Ok(())
    }

    async fn append_all(&self, messages: Vec<TranscriptMessage>) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        for message in messages {
            conversations
                .entry(message.conversation_id)
                .or_insert_with(Vec::new)
                .push(message);
        }
        Ok(())
    }
}

/// Postgres-backed store with lazy schema creation.
pub struct PgTranscriptStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgTranscriptStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS transcript_messages (
                      message_id UUID PRIMARY KEY,
                      conversation_id UUID NOT NULL,
                      role TEXT NOT NULL,
                      content TEXT NOT NULL,
                      sources JSONB NOT NULL DEFAULT '[]',
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_transcript_messages_conversation
                    ON transcript_messages (conversation_id, created_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                crate::error::AdvisoryError::PersistenceError(format!(
                    "Failed to initialize transcript schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for PgTranscriptStore {
    async fn append(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        sources: &[Candidate],
    ) -> Result<()> {
        let message = TranscriptMessage::new(conversation_id, role, content, sources.to_vec());
        self.append_all(vec![message]).await
    }

    async fn append_all(&self, messages: Vec<TranscriptMessage>) -> Result<()> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await?;

        for message in &messages {
            sqlx::query(
                r#"
                INSERT INTO transcript_messages
                  (message_id, conversation_id, role, content, sources, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(message.message_id)
            .bind(message.conversation_id)
            .bind(message.role.to_string())
            .bind(&message.content)
            .bind(serde_json::to_value(&message.sources)?)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Store that rejects every write; used to exercise terminal-failure paths.
pub struct FailingTranscriptStore;

#[async_trait]
impl TranscriptStore for FailingTranscriptStore {
    async fn append(
        &self,
        _conversation_id: Uuid,
        _role: MessageRole,
        _content: &str,
        _sources: &[Candidate],
    ) -> Result<()> {
        Err(crate::error::AdvisoryError::PersistenceError(
            "transcript store offline".to_string(),
        ))
    }

    async fn append_all(&self, _messages: Vec<TranscriptMessage>) -> Result<()> {
        Err(crate::error::AdvisoryError::PersistenceError(
            "transcript store offline".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = InMemoryTranscriptStore::new();
        let conversation = Uuid::new_v4();

        store
            .append(conversation, MessageRole::User, "question", &[])
            .await
            .unwrap();
        store
            .append(conversation, MessageRole::Assistant, "answer", &[])
            .await
            .unwrap();

        let messages = store.messages(conversation).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].content, "answer");
    }

    #[tokio::test]
    async fn test_append_all_lands_as_batch() {
        let store = InMemoryTranscriptStore::new();
        let conversation = Uuid::new_v4();

        store
            .append_all(vec![
                TranscriptMessage::new(conversation, MessageRole::Assistant, "a", vec![]),
                TranscriptMessage::new(conversation, MessageRole::Assistant, "b", vec![]),
            ])
            .await
            .unwrap();

        let messages = store.messages(conversation).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "a");
        assert_eq!(messages[1].content, "b");
    }
}
