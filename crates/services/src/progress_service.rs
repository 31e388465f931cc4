use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{PracticeMode, QuestionCategory, Skill, UserId, UserProgress};
use prep_core::progress::{self, WeakArea, WeeklyUsage};
use storage::repository::{ProgressRepository, SessionRepository};

use crate::error::ProgressError;

/// How many recent attempts feed weak-area detection.
const RECENT_ATTEMPT_WINDOW: u32 = 100;

/// Loads, mutates, and persists the per-user progress row.
///
/// All aggregation math lives in `prep_core::progress`; this service only
/// adds the clock and the storage round-trip.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            sessions,
        }
    }

    /// Current progress snapshot; a fresh row for users who never practiced.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn get_or_init(&self, user_id: UserId) -> Result<UserProgress, ProgressError> {
        Ok(self
            .progress
            .get_progress(user_id)
            .await?
            .unwrap_or_default())
    }

    /// Applies one completed question to the progress row and persists it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn complete_question(
        &self,
        user_id: UserId,
        mode: PracticeMode,
        category: QuestionCategory,
    ) -> Result<UserProgress, ProgressError> {
        let mut snapshot = self.get_or_init(user_id).await?;
        progress::record_completion(&mut snapshot, mode, category, self.clock.today());
        self.progress.upsert_progress(user_id, &snapshot).await?;
        Ok(snapshot)
    }

    /// Records a 0-100 mastery score for a skill (ratchet, never lowers).
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn record_mastery(
        &self,
        user_id: UserId,
        skill: Skill,
        score: u8,
    ) -> Result<UserProgress, ProgressError> {
        let mut snapshot = self.get_or_init(user_id).await?;
        progress::apply_mastery(&mut snapshot, skill, score);
        self.progress.upsert_progress(user_id, &snapshot).await?;
        Ok(snapshot)
    }

    /// Records an evaluator's 1-10 rubric score, scaled to 0-100.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn record_rubric_mastery(
        &self,
        user_id: UserId,
        skill: Skill,
        rubric_score: u8,
    ) -> Result<UserProgress, ProgressError> {
        self.record_mastery(user_id, skill, rubric_score.min(10) * 10)
            .await
    }

    /// Weak categories over the user's recent attempts, worst first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn weak_areas(&self, user_id: UserId) -> Result<Vec<WeakArea>, ProgressError> {
        let attempts = self
            .sessions
            .recent_attempts(user_id, RECENT_ATTEMPT_WINDOW)
            .await?;
        Ok(progress::weak_areas(&attempts))
    }

    /// Free-tier weekly usage as of today.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn weekly_usage(&self, user_id: UserId) -> Result<WeeklyUsage, ProgressError> {
        let snapshot = self.get_or_init(user_id).await?;
        Ok(progress::weekly_usage(&snapshot, self.clock.today()))
    }

    /// Wipes the progress row back to a fresh state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` on storage failure.
    pub async fn reset(&self, user_id: UserId) -> Result<(), ProgressError> {
        let mut snapshot = self.get_or_init(user_id).await?;
        progress::reset(&mut snapshot);
        self.progress.upsert_progress(user_id, &snapshot).await?;
        Ok(())
    }
}
