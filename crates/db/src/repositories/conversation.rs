use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use minerbot_core::collaborators::ConversationStore;
use minerbot_core::conversation::state::{ConversationId, ConversationState};
use minerbot_core::errors::CollaboratorError;

use super::RepositoryError;
use crate::DbPool;

const COLLABORATOR: &str = "conversation_store";

/// Conversation state stored as one JSON document per conversation id.
pub struct SqlConversationStateRepository {
    pool: DbPool,
}

impl SqlConversationStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Raw JSON document, if the conversation has been seen before.
    pub async fn find_json(&self, conversation_id: &str) -> Result<Option<String>, RepositoryError> {
        let json = sqlx::query_scalar(
            "SELECT state_json FROM conversation_state WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(json)
    }

    /// Loads and decodes a state. An undecodable document counts as a fresh conversation.
    pub async fn find(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let Some(json) = self.find_json(conversation_id.as_str()).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<ConversationState>(&json) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                warn!(
                    event_name = "conversation.state_undecodable",
                    conversation_id = %conversation_id,
                    error = %error,
                    "stored conversation state could not be decoded; starting over"
                );
                Ok(None)
            }
        }
    }

    pub async fn upsert(
        &self,
        conversation_id: &ConversationId,
        state: &ConversationState,
    ) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(state)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversation_state (conversation_id, state_json, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 state_json = excluded.state_json,
                 updated_at = excluded.updated_at",
        )
        .bind(conversation_id.as_str())
        .bind(&json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, conversation_id: &ConversationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversation_state WHERE conversation_id = ?")
            .bind(conversation_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConversationStore for SqlConversationStateRepository {
    async fn load(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationState>, CollaboratorError> {
        self.find(conversation_id).await.map_err(|error| error.into_collaborator(COLLABORATOR))
    }

    async fn save(
        &self,
        conversation_id: &ConversationId,
        state: &ConversationState,
    ) -> Result<(), CollaboratorError> {
        self.upsert(conversation_id, state)
            .await
            .map_err(|error| error.into_collaborator(COLLABORATOR))
    }
}

#[cfg(test)]
mod tests {
    use minerbot_core::collaborators::ConversationStore;
    use minerbot_core::conversation::state::{default_state, AwaitingFreeText, ConversationId};
    use minerbot_core::domain::menu::MenuId;

    use super::SqlConversationStateRepository;
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn repository() -> (DbPool, SqlConversationStateRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        (pool.clone(), SqlConversationStateRepository::new(pool))
    }

    #[tokio::test]
    async fn state_survives_a_save_load_cycle_and_is_overwritten_in_place() {
        let (pool, repository) = repository().await;
        let id = ConversationId::new("msteams:a:1");

        assert_eq!(repository.load(&id).await.expect("load"), None);

        let mut state = default_state();
        state.is_authenticated = true;
        state.current_menu_id = MenuId::TiposSegurosSalud;
        state.menu_stack = vec![MenuId::Main, MenuId::SaludSeguros];
        state.awaiting_free_text = AwaitingFreeText::None;
        repository.save(&id, &state).await.expect("save");

        state.menu_stack.pop();
        state.current_menu_id = MenuId::SaludSeguros;
        repository.save(&id, &state).await.expect("save again");

        assert_eq!(repository.load(&id).await.expect("load"), Some(state));
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM conversation_state")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn stored_json_uses_camel_case_keys() {
        let (_pool, repository) = repository().await;
        let id = ConversationId::new("msteams:b:2");
        repository.save(&id, &default_state()).await.expect("save");

        let json = repository.find_json(id.as_str()).await.expect("find").expect("row");
        assert!(json.contains("\"currentMenuId\":\"auth\""));
        assert!(json.contains("\"menuStack\":[]"));
        assert!(json.contains("\"awaitingFreeText\""));
    }

    #[tokio::test]
    async fn undecodable_documents_read_as_fresh_conversations() {
        let (pool, repository) = repository().await;
        sqlx::query(
            "INSERT INTO conversation_state (conversation_id, state_json, created_at, updated_at)
             VALUES ('broken', '{\"currentMenuId\": \"noSuchMenu\"}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert broken row");

        assert_eq!(repository.load(&ConversationId::new("broken")).await.expect("load"), None);
    }

    #[tokio::test]
    async fn missing_keys_take_defaults() {
        let (pool, repository) = repository().await;
        sqlx::query(
            "INSERT INTO conversation_state (conversation_id, state_json, created_at, updated_at)
             VALUES ('partial', '{\"isAuthenticated\": false, \"extra\": 1}', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert partial row");

        let loaded = repository.load(&ConversationId::new("partial")).await.expect("load");
        assert_eq!(loaded, Some(default_state()));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let (_pool, repository) = repository().await;
        let id = ConversationId::new("gone");
        repository.save(&id, &default_state()).await.expect("save");

        assert!(repository.delete(&id).await.expect("delete"));
        assert!(!repository.delete(&id).await.expect("delete again"));
    }
}
