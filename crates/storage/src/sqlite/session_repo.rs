use chrono::{DateTime, Utc};
use prep_core::model::{AttemptRecord, PracticeMode, QuestionId, SessionId, UserId};
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{SessionRepository, SessionRow, StorageError, SubmissionRecord};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        mode: PracticeMode,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError> {
        let known = sqlx::query("SELECT 1 FROM questions WHERE id = ?1")
            .bind(question_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if known.is_none() {
            return Err(StorageError::NotFound);
        }

        let id = SessionId::generate();
        sqlx::query(
            r"
            INSERT INTO practice_sessions (
                id, user_id, question_id, mode, completed, elapsed_seconds,
                answer, sub_answers, correct, feedback, created_at
            )
            VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, NULL, NULL, ?7)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(question_id.to_string())
        .bind(mode.as_str())
        .bind(mapping::to_json(&prep_core::model::Answer::empty())?)
        .bind("[]")
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(id)
    }

    async fn submit_answer(
        &self,
        session_id: SessionId,
        submission: &SubmissionRecord,
    ) -> Result<(), StorageError> {
        let feedback = submission
            .feedback
            .as_ref()
            .map(mapping::to_json)
            .transpose()?;

        let result = sqlx::query(
            r"
            UPDATE practice_sessions SET
                completed = 1,
                elapsed_seconds = ?2,
                answer = ?3,
                sub_answers = ?4,
                correct = ?5,
                feedback = ?6
            WHERE id = ?1
            ",
        )
        .bind(session_id.to_string())
        .bind(i64::from(submission.elapsed_seconds))
        .bind(mapping::to_json(&submission.answer)?)
        .bind(mapping::to_json(&submission.sub_answers)?)
        .bind(submission.correct)
        .bind(feedback)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<SessionRow, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, user_id, question_id, mode, completed, elapsed_seconds,
                answer, sub_answers, correct, feedback, created_at
            FROM practice_sessions
            WHERE id = ?1
            ",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        mapping::map_session_row(&row)
    }

    async fn recent_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                s.question_id, q.category, s.mode, s.completed,
                s.correct, s.sub_answers, s.created_at
            FROM practice_sessions s
            JOIN questions q ON q.id = s.question_id
            WHERE s.user_id = ?1
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            let category_str: String = row
                .try_get("category")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let mode_str: String = row
                .try_get("mode")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let sub_answers_json: String = row
                .try_get("sub_answers")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let question_id_str: String = row
                .try_get("question_id")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            attempts.push(AttemptRecord {
                question_id: mapping::question_id_from_str(&question_id_str)?,
                category: mapping::parse_category(&category_str)?,
                mode: mapping::parse_mode(&mode_str)?,
                completed: row
                    .try_get("completed")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
                correct: row
                    .try_get("correct")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
                sub_answers: mapping::from_json(&sub_answers_json)?,
                created_at: row
                    .try_get("created_at")
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            });
        }
        Ok(attempts)
    }
}
