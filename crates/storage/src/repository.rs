use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prep_core::model::{
    Answer, AttemptRecord, Feedback, PracticeMode, Question, QuestionId, SessionId, SubAnswer,
    UserId, UserProgress,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Everything recorded when an answer is submitted for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub answer: Answer,
    pub elapsed_seconds: u32,
    /// Per-sub-question answers; empty outside MCQ mode.
    pub sub_answers: Vec<SubAnswer>,
    /// Verdict for the submission, when one is known at submit time.
    pub correct: Option<bool>,
    pub feedback: Option<Feedback>,
}

/// Persisted shape of one practice session.
///
/// Mirrors the domain view closely enough that repositories can
/// serialize/deserialize without leaking storage concerns upward.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub mode: PracticeMode,
    pub completed: bool,
    pub elapsed_seconds: u32,
    pub answer: Answer,
    pub sub_answers: Vec<SubAnswer>,
    pub correct: Option<bool>,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

/// Repository contract for question content.
///
/// Content is authored elsewhere; `upsert_question` exists for seeding
/// and tests, the core only reads.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// List up to `limit` questions, in stable content order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for practice sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new incomplete session for one attempt at one question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the question id is unknown to
    /// the store; the caller must not fabricate a session around that.
    async fn create_session(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        mode: PracticeMode,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError>;

    /// Record a submission and mark the session completed.
    ///
    /// Resubmission updates the row in place but never un-completes it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown session id.
    async fn submit_answer(
        &self,
        session_id: SessionId,
        submission: &SubmissionRecord,
    ) -> Result<(), StorageError>;

    /// Fetch one session row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_session(&self, session_id: SessionId) -> Result<SessionRow, StorageError>;

    /// The user's most recent attempts joined with question category,
    /// newest first. Feeds weak-area detection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn recent_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Repository contract for saved-but-unsubmitted free-text answers.
///
/// Keyed by (user, question); the upsert key enforces at most one draft
/// per pair, which is what makes draft saves idempotent.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Save or replace the draft for this (user, question) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the draft cannot be stored.
    async fn upsert_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        text: &str,
    ) -> Result<(), StorageError>;

    /// Fetch the draft text, `None` when no draft exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn get_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<Option<String>, StorageError>;

    /// Remove the draft; missing drafts are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn delete_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the per-user progress row.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress row, `None` when the user has never practiced;
    /// the caller initializes lazily.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn get_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError>;

    /// Write the whole progress row in a single statement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the locally persisted set of already-announced
/// achievement ids.
#[async_trait]
pub trait UnlockRepository: Send + Sync {
    /// Fetch the last-known unlocked id set; empty when never saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn get_unlocked_ids(&self, user_id: UserId) -> Result<BTreeSet<String>, StorageError>;

    /// Replace the unlocked id set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn set_unlocked_ids(
        &self,
        user_id: UserId,
        ids: &BTreeSet<String>,
    ) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<HashMap<SessionId, SessionRow>>>,
    drafts: Arc<Mutex<HashMap<(UserId, QuestionId), String>>>,
    progress: Arc<Mutex<HashMap<UserId, UserProgress>>>,
    unlocks: Arc<Mutex<HashMap<UserId, BTreeSet<String>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(
        guard: &'a Arc<Mutex<T>>,
    ) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
        guard
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.questions)?;
        guard.insert(question.id, question.clone());
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let guard = Self::lock(&self.questions)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        let mut questions: Vec<Question> = guard.values().cloned().collect();
        questions.sort_by_key(|q| q.id);
        questions.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(questions)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        mode: PracticeMode,
        created_at: DateTime<Utc>,
    ) -> Result<SessionId, StorageError> {
        {
            let questions = Self::lock(&self.questions)?;
            if !questions.contains_key(&question_id) {
                return Err(StorageError::NotFound);
            }
        }

        let id = SessionId::generate();
        let row = SessionRow {
            id,
            user_id,
            question_id,
            mode,
            completed: false,
            elapsed_seconds: 0,
            answer: Answer::empty(),
            sub_answers: Vec::new(),
            correct: None,
            feedback: None,
            created_at,
        };
        let mut guard = Self::lock(&self.sessions)?;
        guard.insert(id, row);
        Ok(id)
    }

    async fn submit_answer(
        &self,
        session_id: SessionId,
        submission: &SubmissionRecord,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.sessions)?;
        let row = guard.get_mut(&session_id).ok_or(StorageError::NotFound)?;
        row.answer = submission.answer.clone();
        row.elapsed_seconds = submission.elapsed_seconds;
        row.sub_answers = submission.sub_answers.clone();
        row.correct = submission.correct;
        row.feedback = submission.feedback.clone();
        // a completed session stays completed on resubmission
        row.completed = true;
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<SessionRow, StorageError> {
        let guard = Self::lock(&self.sessions)?;
        guard
            .get(&session_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn recent_attempts(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let questions = Self::lock(&self.questions)?;
        let sessions = Self::lock(&self.sessions)?;

        let mut rows: Vec<&SessionRow> = sessions
            .values()
            .filter(|row| row.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(question) = questions.get(&row.question_id) else {
                continue;
            };
            attempts.push(AttemptRecord {
                question_id: row.question_id,
                category: question.category,
                mode: row.mode,
                completed: row.completed,
                correct: row.correct,
                sub_answers: row.sub_answers.clone(),
                created_at: row.created_at,
            });
        }
        Ok(attempts)
    }
}

#[async_trait]
impl DraftRepository for InMemoryRepository {
    async fn upsert_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        text: &str,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.drafts)?;
        guard.insert((user_id, question_id), text.to_string());
        Ok(())
    }

    async fn get_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<Option<String>, StorageError> {
        let guard = Self::lock(&self.drafts)?;
        Ok(guard.get(&(user_id, question_id)).cloned())
    }

    async fn delete_draft(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.drafts)?;
        guard.remove(&(user_id, question_id));
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, user_id: UserId) -> Result<Option<UserProgress>, StorageError> {
        let guard = Self::lock(&self.progress)?;
        Ok(guard.get(&user_id).cloned())
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.progress)?;
        guard.insert(user_id, progress.clone());
        Ok(())
    }
}

#[async_trait]
impl UnlockRepository for InMemoryRepository {
    async fn get_unlocked_ids(&self, user_id: UserId) -> Result<BTreeSet<String>, StorageError> {
        let guard = Self::lock(&self.unlocks)?;
        Ok(guard.get(&user_id).cloned().unwrap_or_default())
    }

    async fn set_unlocked_ids(
        &self,
        user_id: UserId,
        ids: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.unlocks)?;
        guard.insert(user_id, ids.clone());
        Ok(())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub drafts: Arc<dyn DraftRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub unlocks: Arc<dyn UnlockRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            drafts: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            unlocks: Arc::new(repo),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
