use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (questions, practice sessions, answer drafts,
/// progress rows, achievement unlocks, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT PRIMARY KEY,
                    text TEXT NOT NULL,
                    category TEXT NOT NULL,
                    difficulty TEXT NOT NULL,
                    skill TEXT,
                    sub_questions TEXT NOT NULL,
                    expert_answer TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS practice_sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    mode TEXT NOT NULL,
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    elapsed_seconds INTEGER NOT NULL CHECK (elapsed_seconds >= 0),
                    answer TEXT NOT NULL,
                    sub_answers TEXT NOT NULL,
                    correct INTEGER,
                    feedback TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_drafts (
                    user_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    draft_text TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, question_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_progress (
                    user_id TEXT PRIMARY KEY,
                    current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
                    longest_streak INTEGER NOT NULL CHECK (longest_streak >= 0),
                    last_practice_date TEXT,
                    total_questions_completed INTEGER NOT NULL CHECK (total_questions_completed >= 0),
                    total_mcq_completed INTEGER NOT NULL CHECK (total_mcq_completed >= 0),
                    total_text_completed INTEGER NOT NULL CHECK (total_text_completed >= 0),
                    category_progress TEXT NOT NULL,
                    framework_mastery TEXT NOT NULL,
                    pattern_mastery TEXT NOT NULL,
                    readiness_score INTEGER NOT NULL CHECK (readiness_score BETWEEN 0 AND 100),
                    readiness_by_category TEXT NOT NULL,
                    weekly_questions_used INTEGER NOT NULL CHECK (weekly_questions_used >= 0),
                    week_reset_date TEXT,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS achievement_unlocks (
                    user_id TEXT PRIMARY KEY,
                    unlocked_ids TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_user_created
                    ON practice_sessions (user_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
