use chrono::{NaiveDate, Utc};
use prep_core::model::{UserId, UserProgress};
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{ProgressRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_col(row: &sqlx::sqlite::SqliteRow, name: &'static str) -> Result<u32, StorageError> {
    let v: i64 = row.try_get(name).map_err(ser)?;
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {name}: {v}")))
}

fn u8_col(row: &sqlx::sqlite::SqliteRow, name: &'static str) -> Result<u8, StorageError> {
    let v: i64 = row.try_get(name).map_err(ser)?;
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {name}: {v}")))
}

fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserProgress, StorageError> {
    let last_practice_date: Option<NaiveDate> = row.try_get("last_practice_date").map_err(ser)?;
    let week_reset_date: Option<NaiveDate> = row.try_get("week_reset_date").map_err(ser)?;

    Ok(UserProgress {
        current_streak: u32_col(row, "current_streak")?,
        longest_streak: u32_col(row, "longest_streak")?,
        last_practice_date,
        total_questions_completed: u32_col(row, "total_questions_completed")?,
        total_mcq_completed: u32_col(row, "total_mcq_completed")?,
        total_text_completed: u32_col(row, "total_text_completed")?,
        category_progress: mapping::from_json(
            &row.try_get::<String, _>("category_progress").map_err(ser)?,
        )?,
        framework_mastery: mapping::from_json(
            &row.try_get::<String, _>("framework_mastery").map_err(ser)?,
        )?,
        pattern_mastery: mapping::from_json(
            &row.try_get::<String, _>("pattern_mastery").map_err(ser)?,
        )?,
        readiness_score: u8_col(row, "readiness_score")?,
        readiness_by_category: mapping::from_json(
            &row.try_get::<String, _>("readiness_by_category")
                .map_err(ser)?,
        )?,
        weekly_questions_used: u32_col(row, "weekly_questions_used")?,
        week_reset_date,
    })
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                current_streak, longest_streak, last_practice_date,
                total_questions_completed, total_mcq_completed, total_text_completed,
                category_progress, framework_mastery, pattern_mastery,
                readiness_score, readiness_by_category,
                weekly_questions_used, week_reset_date
            FROM user_progress
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| map_progress_row(&r)).transpose()
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        // Whole row in one statement; the row is only ever written by the
        // owning user's session loop.
        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, current_streak, longest_streak, last_practice_date,
                total_questions_completed, total_mcq_completed, total_text_completed,
                category_progress, framework_mastery, pattern_mastery,
                readiness_score, readiness_by_category,
                weekly_questions_used, week_reset_date, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(user_id) DO UPDATE SET
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                last_practice_date = excluded.last_practice_date,
                total_questions_completed = excluded.total_questions_completed,
                total_mcq_completed = excluded.total_mcq_completed,
                total_text_completed = excluded.total_text_completed,
                category_progress = excluded.category_progress,
                framework_mastery = excluded.framework_mastery,
                pattern_mastery = excluded.pattern_mastery,
                readiness_score = excluded.readiness_score,
                readiness_by_category = excluded.readiness_by_category,
                weekly_questions_used = excluded.weekly_questions_used,
                week_reset_date = excluded.week_reset_date,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(progress.current_streak))
        .bind(i64::from(progress.longest_streak))
        .bind(progress.last_practice_date)
        .bind(i64::from(progress.total_questions_completed))
        .bind(i64::from(progress.total_mcq_completed))
        .bind(i64::from(progress.total_text_completed))
        .bind(mapping::to_json(&progress.category_progress)?)
        .bind(mapping::to_json(&progress.framework_mastery)?)
        .bind(mapping::to_json(&progress.pattern_mastery)?)
        .bind(i64::from(progress.readiness_score))
        .bind(mapping::to_json(&progress.readiness_by_category)?)
        .bind(i64::from(progress.weekly_questions_used))
        .bind(progress.week_reset_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
