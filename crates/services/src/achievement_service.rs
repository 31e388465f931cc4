use std::sync::Arc;

use prep_core::achievements::{self, AchievementDef};
use prep_core::model::{UserId, UserProgress};
use storage::repository::UnlockRepository;

use crate::error::AchievementError;

/// Evaluates achievement rules after progress updates and remembers which
/// unlocks were already announced.
#[derive(Clone)]
pub struct AchievementService {
    unlocks: Arc<dyn UnlockRepository>,
}

impl AchievementService {
    #[must_use]
    pub fn new(unlocks: Arc<dyn UnlockRepository>) -> Self {
        Self { unlocks }
    }

    /// Returns achievements newly unlocked by this snapshot and persists
    /// them so they are announced at most once.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError` on storage failure.
    pub async fn check_unlocks(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<Vec<&'static AchievementDef>, AchievementError> {
        let mut seen = self.unlocks.get_unlocked_ids(user_id).await?;
        let fresh = achievements::newly_unlocked(progress, &seen);
        if !fresh.is_empty() {
            for def in &fresh {
                seen.insert(def.id.to_string());
            }
            self.unlocks.set_unlocked_ids(user_id, &seen).await?;
        }
        Ok(fresh)
    }

    /// Every achievement the user has ever been announced as unlocking.
    ///
    /// # Errors
    ///
    /// Returns `AchievementError` on storage failure.
    pub async fn unlocked(
        &self,
        user_id: UserId,
    ) -> Result<Vec<&'static AchievementDef>, AchievementError> {
        let seen = self.unlocks.get_unlocked_ids(user_id).await?;
        Ok(achievements::ACHIEVEMENTS
            .iter()
            .filter(|def| seen.contains(def.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;

    #[tokio::test]
    async fn unlocks_are_announced_exactly_once() {
        let storage = Storage::in_memory();
        let service = AchievementService::new(Arc::clone(&storage.unlocks));
        let user = UserId::generate();

        let mut progress = UserProgress::new();
        progress.total_questions_completed = 1;

        let first: Vec<_> = service
            .check_unlocks(user, &progress)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(first, vec!["first_step"]);

        let again = service.check_unlocks(user, &progress).await.unwrap();
        assert!(again.is_empty());

        let all: Vec<_> = service
            .unlocked(user)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(all, vec!["first_step"]);
    }

    #[tokio::test]
    async fn later_snapshots_only_report_the_delta() {
        let storage = Storage::in_memory();
        let service = AchievementService::new(Arc::clone(&storage.unlocks));
        let user = UserId::generate();

        let mut progress = UserProgress::new();
        progress.total_questions_completed = 1;
        service.check_unlocks(user, &progress).await.unwrap();

        progress.total_questions_completed = 5;
        progress.current_streak = 3;
        let delta: Vec<_> = service
            .check_unlocks(user, &progress)
            .await
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(delta, vec!["streak_3", "getting_started"]);
    }
}
