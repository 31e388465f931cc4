//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::QuestionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PracticeEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
    #[error("no valid questions for quiz")]
    EmptyQuiz,
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Achievement(#[from] AchievementError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AchievementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AchievementError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FeedbackService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("answer evaluation is not configured")]
    Disabled,
    #[error("answer evaluation returned an empty response")]
    EmptyResponse,
    #[error("answer evaluation returned score {0}, expected 1-10")]
    InvalidScore(u8),
    #[error("answer evaluation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
