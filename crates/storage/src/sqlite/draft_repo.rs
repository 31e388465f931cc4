use chrono::Utc;
use prep_core::model::{QuestionId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{DraftRepository, StorageError};

#[async_trait::async_trait]
impl DraftRepository for SqliteRepository {
    async fn upsert_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        text: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO answer_drafts (user_id, question_id, draft_text, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, question_id) DO UPDATE SET
                draft_text = excluded.draft_text,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(question_id.to_string())
        .bind(text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT draft_text
            FROM answer_drafts
            WHERE user_id = ?1 AND question_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(question_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| {
            r.try_get("draft_text")
                .map_err(|e| StorageError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn delete_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            DELETE FROM answer_drafts
            WHERE user_id = ?1 AND question_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(question_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
