use std::sync::Arc;

use prep_core::model::UserId;
use storage::repository::Storage;

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::error::AppServicesError;
use crate::feedback_service::FeedbackService;
use crate::practice::PracticeEngine;
use crate::progress_service::ProgressService;

/// Assembles app-facing services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    progress: ProgressService,
    achievements: AchievementService,
    feedback: Arc<FeedbackService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    fn from_storage(storage: Storage, clock: Clock) -> Self {
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.sessions),
        );
        let achievements = AchievementService::new(Arc::clone(&storage.unlocks));
        let feedback = Arc::new(FeedbackService::from_env());
        Self {
            clock,
            storage,
            progress,
            achievements,
            feedback,
        }
    }

    /// A fresh practice engine for one user's flow.
    #[must_use]
    pub fn practice_engine(&self, user_id: UserId) -> PracticeEngine {
        PracticeEngine::new(
            self.clock,
            user_id,
            Arc::clone(&self.storage.sessions),
            Arc::clone(&self.storage.drafts),
            self.progress.clone(),
            self.achievements.clone(),
        )
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    #[must_use]
    pub fn achievements(&self) -> &AchievementService {
        &self.achievements
    }

    #[must_use]
    pub fn feedback(&self) -> Arc<FeedbackService> {
        Arc::clone(&self.feedback)
    }
}
