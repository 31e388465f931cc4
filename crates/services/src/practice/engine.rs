use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use prep_core::Clock;
use prep_core::achievements::AchievementDef;
use prep_core::model::{
    Answer, Feedback, Outline, PracticeMode, Question, SessionId, SubAnswer, UserId,
};
use storage::repository::{DraftRepository, SessionRepository, SubmissionRecord};

use super::quiz::{QuizAnswer, QuizScore, QuizState};
use crate::achievement_service::AchievementService;
use crate::error::PracticeError;
use crate::progress_service::ProgressService;

//
// ─── SESSION HANDLE ────────────────────────────────────────────────────────────
//

/// Whether the current attempt is backed by a persisted session row.
///
/// Creation failures degrade to `Unpersisted` so the learner can keep
/// working offline; nothing downstream ever sees a fabricated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionHandle {
    Persisted(SessionId),
    Unpersisted,
}

//
// ─── PRACTICE ENGINE ───────────────────────────────────────────────────────────
//

/// Owns all mutable state of one learner's practice flow: the active
/// question, recorded answers, the optional quiz queue, and the handle to
/// the persisted session row.
///
/// Persistence failures after start never block forward progress; they are
/// logged, kept in `last_error`, and surfaced as `false` results.
pub struct PracticeEngine {
    clock: Clock,
    user_id: UserId,
    sessions: Arc<dyn SessionRepository>,
    drafts: Arc<dyn DraftRepository>,
    progress: ProgressService,
    achievements: AchievementService,

    question: Option<Question>,
    mode: PracticeMode,
    handle: SessionHandle,
    sub_index: usize,
    sub_answers: Vec<SubAnswer>,
    answer: Answer,
    feedback: Option<Feedback>,
    started_at: DateTime<Utc>,
    quiz: Option<QuizState>,
    last_error: Option<PracticeError>,
    recent_unlocks: Vec<&'static AchievementDef>,
}

impl PracticeEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        user_id: UserId,
        sessions: Arc<dyn SessionRepository>,
        drafts: Arc<dyn DraftRepository>,
        progress: ProgressService,
        achievements: AchievementService,
    ) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            user_id,
            sessions,
            drafts,
            progress,
            achievements,
            question: None,
            mode: PracticeMode::Text,
            handle: SessionHandle::Unpersisted,
            sub_index: 0,
            sub_answers: Vec::new(),
            answer: Answer::empty(),
            feedback: None,
            started_at,
            quiz: None,
            last_error: None,
            recent_unlocks: Vec::new(),
        }
    }

    /// Starts a single-question attempt.
    ///
    /// The question is validated before anything is persisted. If session
    /// creation fails the attempt continues unpersisted with the failure
    /// recorded in `last_error`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::InvalidQuestion` for unusable content.
    pub async fn start_practice(
        &mut self,
        question: Question,
        mode: PracticeMode,
    ) -> Result<(), PracticeError> {
        question.validate()?;

        self.mode = mode;
        self.sub_index = 0;
        self.sub_answers.clear();
        self.answer = Answer::empty();
        self.feedback = None;
        self.started_at = self.clock.now();
        self.last_error = None;
        self.recent_unlocks.clear();

        self.handle = match self
            .sessions
            .create_session(self.user_id, question.id, mode, self.started_at)
            .await
        {
            Ok(id) => SessionHandle::Persisted(id),
            Err(e) => {
                warn!(question_id = %question.id, error = %e, "session creation failed, continuing unpersisted");
                self.last_error = Some(e.into());
                SessionHandle::Unpersisted
            }
        };
        self.question = Some(question);
        Ok(())
    }

    /// Starts a multi-question quiz in MCQ mode.
    ///
    /// Invalid questions are dropped from the queue up front.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::EmptyQuiz` when no valid questions remain.
    pub async fn start_quiz(&mut self, questions: Vec<Question>) -> Result<(), PracticeError> {
        let valid: Vec<Question> = questions.into_iter().filter(Question::is_valid).collect();
        let Some(first) = valid.first().cloned() else {
            return Err(PracticeError::EmptyQuiz);
        };
        self.quiz = Some(QuizState::new(valid));
        self.start_practice(first, PracticeMode::Mcq).await
    }

    /// Records an answer to a sub-question; answering the same index again
    /// replaces the earlier record.
    pub fn answer_sub_question(&mut self, sub_question: usize, selected_option: usize, correct: bool) {
        let answer = SubAnswer {
            sub_question,
            selected_option,
            correct,
        };
        if let Some(existing) = self
            .sub_answers
            .iter_mut()
            .find(|a| a.sub_question == sub_question)
        {
            *existing = answer;
        } else {
            self.sub_answers.push(answer);
        }
    }

    pub fn set_text_answer(&mut self, text: impl Into<String>) {
        self.answer = Answer::Text(text.into());
    }

    pub fn set_outline_answer(&mut self, outline: Outline) {
        self.answer = Answer::Outline(outline);
    }

    /// Attach evaluator feedback so the submission carries it.
    pub fn set_feedback(&mut self, feedback: Feedback) {
        self.feedback = Some(feedback);
    }

    /// Persists the current answer state.
    ///
    /// Returns `false` without touching storage when there is no question
    /// or no persisted session. On the final sub-question the completion
    /// flows into progress and achievement evaluation; failures there are
    /// logged but do not take the submission down with them.
    pub async fn submit_answer(&mut self) -> bool {
        let Some(question) = self.question.clone() else {
            return false;
        };
        let SessionHandle::Persisted(session_id) = self.handle else {
            return false;
        };

        let elapsed_seconds = self.elapsed_seconds();
        // the scalar verdict covers the sub-question being submitted; the
        // full picture lives in `sub_answers`
        let correct = if self.mode == PracticeMode::Mcq {
            self.sub_answers
                .iter()
                .find(|a| a.sub_question == self.sub_index)
                .map(|a| a.correct)
        } else {
            None
        };
        let record = SubmissionRecord {
            answer: self.answer.clone(),
            elapsed_seconds,
            sub_answers: self.sub_answers.clone(),
            correct,
            feedback: self.feedback.clone(),
        };

        if let Err(e) = self.sessions.submit_answer(session_id, &record).await {
            warn!(session_id = %session_id, error = %e, "failed to persist submission");
            self.last_error = Some(e.into());
            return false;
        }

        if self.mode == PracticeMode::Mcq {
            self.record_quiz_answer(&question, elapsed_seconds);
        }

        if self.sub_index >= question.last_sub_index() {
            self.finish_question(&question).await;
        }

        true
    }

    /// Moves to the next sub-question within the current question; no-op at
    /// the last one.
    pub fn next_sub_question(&mut self) {
        if let Some(question) = &self.question {
            if self.sub_index < question.last_sub_index() {
                self.sub_index += 1;
            }
        }
    }

    /// Advances through the quiz: first across sub-questions, then to the
    /// next queued question. Returns `false` when the quiz is exhausted or
    /// none is active.
    pub async fn advance_quiz(&mut self) -> bool {
        let Some(question) = self.question.clone() else {
            return false;
        };
        if self.quiz.is_none() {
            return false;
        }

        if self.sub_index < question.last_sub_index() {
            self.sub_index += 1;
            if let Some(quiz) = self.quiz.as_mut() {
                quiz.bump_step();
            }
            return true;
        }

        let next = self.quiz.as_mut().and_then(QuizState::next_question);
        match next {
            Some(next_question) => {
                if let Some(quiz) = self.quiz.as_mut() {
                    quiz.bump_step();
                }
                self.start_practice(next_question, PracticeMode::Mcq)
                    .await
                    .is_ok()
            }
            None => false,
        }
    }

    /// Drops all in-memory attempt state, quiz included. Never fails.
    pub fn reset(&mut self) {
        self.question = None;
        self.mode = PracticeMode::Text;
        self.handle = SessionHandle::Unpersisted;
        self.sub_index = 0;
        self.sub_answers.clear();
        self.answer = Answer::empty();
        self.feedback = None;
        self.quiz = None;
        self.last_error = None;
        self.recent_unlocks.clear();
        self.started_at = self.clock.now();
    }

    //
    // ─── DRAFTS ────────────────────────────────────────────────────────────────
    //

    /// Saves the current free-text answer as a draft. Blank text and
    /// non-text answers are a no-op reported as `false`.
    pub async fn save_draft(&mut self) -> bool {
        let Some(question_id) = self.question.as_ref().map(|q| q.id) else {
            return false;
        };
        if self.answer.is_blank() {
            return false;
        }
        let Answer::Text(text) = &self.answer else {
            return false;
        };
        let text = text.clone();

        match self
            .drafts
            .upsert_draft(self.user_id, question_id, &text)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(question_id = %question_id, error = %e, "failed to save draft");
                self.last_error = Some(e.into());
                false
            }
        }
    }

    /// Restores a saved draft into the current answer, if one exists.
    pub async fn load_draft(&mut self) -> Option<String> {
        let question_id = self.question.as_ref()?.id;
        match self.drafts.get_draft(self.user_id, question_id).await {
            Ok(Some(text)) => {
                self.answer = Answer::Text(text.clone());
                Some(text)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(question_id = %question_id, error = %e, "failed to load draft");
                self.last_error = Some(e.into());
                None
            }
        }
    }

    /// Best-effort removal of the draft for the current question.
    pub async fn discard_draft(&mut self) {
        let Some(question) = &self.question else {
            return;
        };
        if let Err(e) = self.drafts.delete_draft(self.user_id, question.id).await {
            debug!(question_id = %question.id, error = %e, "failed to discard draft");
        }
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    /// Score for the current question's sub-answers, 0-100.
    ///
    /// Zero for questions without sub-questions; those are graded by the
    /// external evaluator instead.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn mcq_score(&self) -> u8 {
        let Some(question) = &self.question else {
            return 0;
        };
        let total = question.sub_questions.len();
        if total == 0 {
            return 0;
        }
        let correct = self.sub_answers.iter().filter(|a| a.correct).count();
        (correct as f64 / total as f64 * 100.0).round() as u8
    }

    #[must_use]
    pub fn quiz_score(&self) -> Option<QuizScore> {
        self.quiz.as_ref().map(QuizState::score)
    }

    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    #[must_use]
    pub fn mode(&self) -> PracticeMode {
        self.mode
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    #[must_use]
    pub fn sub_index(&self) -> usize {
        self.sub_index
    }

    #[must_use]
    pub fn sub_answers(&self) -> &[SubAnswer] {
        &self.sub_answers
    }

    #[must_use]
    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    #[must_use]
    pub fn answer_as_text(&self) -> String {
        self.answer.as_text()
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizState> {
        self.quiz.as_ref()
    }

    /// The last swallowed persistence failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&PracticeError> {
        self.last_error.as_ref()
    }

    /// Achievements unlocked by the most recent completion.
    #[must_use]
    pub fn recent_unlocks(&self) -> &[&'static AchievementDef] {
        &self.recent_unlocks
    }

    //
    // ─── INTERNAL ──────────────────────────────────────────────────────────────
    //

    fn elapsed_seconds(&self) -> u32 {
        let seconds = (self.clock.now() - self.started_at).num_seconds().max(0);
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }

    fn record_quiz_answer(&mut self, question: &Question, elapsed_seconds: u32) {
        let Some(quiz) = self.quiz.as_mut() else {
            return;
        };
        let Some(sub) = self
            .sub_answers
            .iter()
            .find(|a| a.sub_question == self.sub_index)
        else {
            return;
        };
        let selected_option_text = question
            .sub_questions
            .get(sub.sub_question)
            .and_then(|sq| sq.options.get(sub.selected_option))
            .map(|o| o.text.clone())
            .unwrap_or_default();
        quiz.record_answer(QuizAnswer {
            question_id: question.id,
            sub_question: sub.sub_question,
            selected_option_text,
            correct: sub.correct,
            elapsed_seconds,
        });
    }

    async fn finish_question(&mut self, question: &Question) {
        match self
            .progress
            .complete_question(self.user_id, self.mode, question.category)
            .await
        {
            Ok(snapshot) => {
                match self.achievements.check_unlocks(self.user_id, &snapshot).await {
                    Ok(fresh) => self.recent_unlocks = fresh,
                    Err(e) => {
                        warn!(error = %e, "achievement evaluation failed after completion");
                        self.last_error = Some(e.into());
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "progress update failed after completion");
                self.last_error = Some(e.into());
            }
        }

        self.discard_draft().await;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prep_core::model::{
        AnswerOption, AttemptRecord, Difficulty, QuestionCategory, QuestionId, SubQuestion,
    };
    use prep_core::time::fixed_clock;
    use storage::repository::{SessionRow, Storage, StorageError};

    fn mcq_question(sub_count: usize) -> Question {
        let sub_questions = (0..sub_count)
            .map(|i| SubQuestion {
                prompt: format!("part {i}"),
                options: vec![
                    AnswerOption {
                        text: "right".into(),
                        correct: true,
                        explanation: String::new(),
                    },
                    AnswerOption {
                        text: "wrong".into(),
                        correct: false,
                        explanation: String::new(),
                    },
                ],
            })
            .collect();
        Question {
            id: QuestionId::generate(),
            text: "What metric matters most here?".into(),
            category: QuestionCategory::Execution,
            difficulty: Difficulty::Beginner,
            skill: None,
            sub_questions,
            expert_answer: None,
        }
    }

    fn text_question() -> Question {
        let mut q = mcq_question(0);
        q.category = QuestionCategory::ProductSense;
        q
    }

    fn engine_with(storage: &Storage) -> PracticeEngine {
        let progress = ProgressService::new(
            fixed_clock(),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.sessions),
        );
        let achievements = AchievementService::new(Arc::clone(&storage.unlocks));
        PracticeEngine::new(
            fixed_clock(),
            UserId::generate(),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.drafts),
            progress,
            achievements,
        )
    }

    #[tokio::test]
    async fn invalid_question_is_rejected_before_persistence() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let mut question = mcq_question(1);
        question.text = "  ".into();
        let err = engine
            .start_practice(question, PracticeMode::Mcq)
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::InvalidQuestion(_)));
        assert!(engine.question().is_none());
    }

    #[tokio::test]
    async fn full_mcq_attempt_completes_progress_and_unlocks() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let question = mcq_question(2);
        storage.questions.upsert_question(&question).await.unwrap();
        engine
            .start_practice(question.clone(), PracticeMode::Mcq)
            .await
            .unwrap();
        assert!(matches!(engine.handle(), SessionHandle::Persisted(_)));

        engine.answer_sub_question(0, 0, true);
        assert!(engine.submit_answer().await);
        engine.next_sub_question();
        engine.answer_sub_question(1, 1, false);
        assert!(engine.submit_answer().await);

        assert_eq!(engine.mcq_score(), 50);
        let unlocks: Vec<_> = engine.recent_unlocks().iter().map(|d| d.id).collect();
        assert_eq!(unlocks, vec!["first_step"]);

        let SessionHandle::Persisted(id) = engine.handle() else {
            panic!("expected persisted handle");
        };
        let row = storage.sessions.get_session(id).await.unwrap();
        assert!(row.completed);
        assert_eq!(row.sub_answers.len(), 2);
        assert_eq!(row.correct, Some(false));
    }

    #[tokio::test]
    async fn answering_again_replaces_the_sub_answer() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let question = mcq_question(1);
        storage.questions.upsert_question(&question).await.unwrap();
        engine
            .start_practice(question, PracticeMode::Mcq)
            .await
            .unwrap();

        engine.answer_sub_question(0, 1, false);
        engine.answer_sub_question(0, 0, true);
        assert_eq!(engine.sub_answers().len(), 1);
        assert_eq!(engine.mcq_score(), 100);
    }

    struct FailingSessions;

    #[async_trait]
    impl SessionRepository for FailingSessions {
        async fn create_session(
            &self,
            _user_id: UserId,
            _question_id: QuestionId,
            _mode: PracticeMode,
            _created_at: DateTime<Utc>,
        ) -> Result<SessionId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn submit_answer(
            &self,
            _session_id: SessionId,
            _submission: &SubmissionRecord,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn get_session(&self, _session_id: SessionId) -> Result<SessionRow, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn recent_attempts(
            &self,
            _user_id: UserId,
            _limit: u32,
        ) -> Result<Vec<AttemptRecord>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn creation_failure_degrades_to_unpersisted() {
        let storage = Storage::in_memory();
        let progress = ProgressService::new(
            fixed_clock(),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.sessions),
        );
        let achievements = AchievementService::new(Arc::clone(&storage.unlocks));
        let mut engine = PracticeEngine::new(
            fixed_clock(),
            UserId::generate(),
            Arc::new(FailingSessions),
            Arc::clone(&storage.drafts),
            progress,
            achievements,
        );

        let question = text_question();
        engine
            .start_practice(question, PracticeMode::Text)
            .await
            .unwrap();
        assert_eq!(engine.handle(), SessionHandle::Unpersisted);
        assert!(engine.last_error().is_some());

        // work continues in memory, but submission reports failure
        engine.set_text_answer("thinking out loud");
        assert!(!engine.submit_answer().await);
        assert_eq!(engine.answer_as_text(), "thinking out loud");
    }

    #[tokio::test]
    async fn quiz_walks_steps_and_questions() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let q1 = mcq_question(3);
        let q2 = mcq_question(0);
        for q in [&q1, &q2] {
            storage.questions.upsert_question(q).await.unwrap();
        }

        engine.start_quiz(vec![q1.clone(), q2.clone()]).await.unwrap();
        let quiz = engine.quiz().unwrap();
        assert_eq!(quiz.total_steps(), 4);
        assert_eq!(quiz.current_step(), 1);
        assert_eq!(engine.question().unwrap().id, q1.id);

        // through q1's three sub-questions
        assert!(engine.advance_quiz().await);
        assert!(engine.advance_quiz().await);
        assert_eq!(engine.quiz().unwrap().current_step(), 3);

        // past the last sub-question moves to q2
        assert!(engine.advance_quiz().await);
        assert_eq!(engine.question().unwrap().id, q2.id);
        assert_eq!(engine.quiz().unwrap().queue_index(), 1);
        assert_eq!(engine.quiz().unwrap().current_step(), 4);

        // q2 has no sub-questions and nothing follows
        assert!(!engine.advance_quiz().await);
    }

    #[tokio::test]
    async fn start_quiz_filters_invalid_and_rejects_empty() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let mut broken = mcq_question(1);
        broken.sub_questions[0].options.clear();
        let err = engine.start_quiz(vec![broken.clone()]).await.unwrap_err();
        assert!(matches!(err, PracticeError::EmptyQuiz));

        let good = mcq_question(1);
        storage.questions.upsert_question(&good).await.unwrap();
        engine.start_quiz(vec![broken, good.clone()]).await.unwrap();
        assert_eq!(engine.quiz().unwrap().queue_len(), 1);
        assert_eq!(engine.question().unwrap().id, good.id);
    }

    #[tokio::test]
    async fn drafts_roundtrip_through_the_engine() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let question = text_question();
        storage.questions.upsert_question(&question).await.unwrap();
        engine
            .start_practice(question.clone(), PracticeMode::Text)
            .await
            .unwrap();

        // blank drafts are refused
        assert!(!engine.save_draft().await);

        // outline answers are not draftable
        engine.set_outline_answer(Outline::from([(
            "Clarify".to_string(),
            vec!["who is the user".to_string()],
        )]));
        assert!(!engine.save_draft().await);

        engine.set_text_answer("outline so far");
        assert!(engine.save_draft().await);

        engine.set_text_answer("");
        assert_eq!(engine.load_draft().await.as_deref(), Some("outline so far"));
        assert_eq!(engine.answer_as_text(), "outline so far");

        engine.discard_draft().await;
        assert_eq!(engine.load_draft().await, None);
    }

    #[tokio::test]
    async fn submitting_a_text_question_clears_its_draft() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let question = text_question();
        storage.questions.upsert_question(&question).await.unwrap();
        engine
            .start_practice(question.clone(), PracticeMode::Text)
            .await
            .unwrap();

        engine.set_text_answer("my answer");
        assert!(engine.save_draft().await);
        assert!(engine.submit_answer().await);
        assert_eq!(engine.load_draft().await, None);
    }

    #[tokio::test]
    async fn reset_clears_quiz_and_question_state() {
        let storage = Storage::in_memory();
        let mut engine = engine_with(&storage);

        let question = mcq_question(1);
        storage.questions.upsert_question(&question).await.unwrap();
        engine.start_quiz(vec![question]).await.unwrap();
        engine.answer_sub_question(0, 0, true);

        engine.reset();
        assert!(engine.question().is_none());
        assert!(engine.quiz().is_none());
        assert!(engine.sub_answers().is_empty());
        assert_eq!(engine.handle(), SessionHandle::Unpersisted);
        assert!(engine.last_error().is_none());
    }
}
