use prep_core::model::{Question, QuestionId};

use super::{SqliteRepository, mapping};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let skill = question
            .skill
            .as_ref()
            .map(mapping::to_json)
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO questions (
                id, text, category, difficulty, skill, sub_questions, expert_answer
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                category = excluded.category,
                difficulty = excluded.difficulty,
                skill = excluded.skill,
                sub_questions = excluded.sub_questions,
                expert_answer = excluded.expert_answer
            ",
        )
        .bind(question.id.to_string())
        .bind(question.text.clone())
        .bind(question.category.as_str())
        .bind(question.difficulty.as_str())
        .bind(skill)
        .bind(mapping::to_json(&question.sub_questions)?)
        .bind(question.expert_answer.clone())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, text, category, difficulty, skill, sub_questions, expert_answer
            FROM questions
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        mapping::map_question_row(&row)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, text, category, difficulty, skill, sub_questions, expert_answer
            FROM questions
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_question_row).collect()
    }
}
