use prep_core::model::{Question, QuestionId};

//
// ─── QUIZ STATE ────────────────────────────────────────────────────────────────
//

/// One granular answer recorded during a quiz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswer {
    pub question_id: QuestionId,
    pub sub_question: usize,
    pub selected_option_text: String,
    pub correct: bool,
    pub elapsed_seconds: u32,
}

/// Final quiz score against the planned step count.
///
/// The denominator is fixed when the quiz starts, so abandoning a quiz
/// early lowers the percentage instead of shrinking the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

/// Bookkeeping for a multi-question quiz run.
///
/// Steps are flattened across the queue: each sub-question is one step,
/// and a question without sub-questions still counts as one.
#[derive(Debug, Clone)]
pub struct QuizState {
    queue: Vec<Question>,
    queue_index: usize,
    answers: Vec<QuizAnswer>,
    total_steps: usize,
    current_step: usize,
}

impl QuizState {
    /// Builds quiz state over an already-validated question queue.
    #[must_use]
    pub fn new(queue: Vec<Question>) -> Self {
        let total_steps = queue.iter().map(Question::step_count).sum();
        Self {
            queue,
            queue_index: 0,
            answers: Vec::new(),
            total_steps,
            current_step: 1,
        }
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// 1-based position in the flattened step sequence, never past the end.
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.queue.get(self.queue_index)
    }

    #[must_use]
    pub fn answers(&self) -> &[QuizAnswer] {
        &self.answers
    }

    /// Moves the step cursor forward, clamped to `total_steps`.
    pub fn bump_step(&mut self) {
        self.current_step = (self.current_step + 1).min(self.total_steps.max(1));
    }

    /// Advances to the next queued question, returning it if one remains.
    pub fn next_question(&mut self) -> Option<Question> {
        self.queue_index += 1;
        self.queue.get(self.queue_index).cloned()
    }

    /// Records a granular answer, replacing any earlier answer to the same
    /// (question, sub-question) pair so re-answering cannot double count.
    pub fn record_answer(&mut self, answer: QuizAnswer) {
        if let Some(existing) = self.answers.iter_mut().find(|a| {
            a.question_id == answer.question_id && a.sub_question == answer.sub_question
        }) {
            *existing = answer;
        } else {
            self.answers.push(answer);
        }
    }

    /// Score over the planned step count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn score(&self) -> QuizScore {
        let correct =
            u32::try_from(self.answers.iter().filter(|a| a.correct).count()).unwrap_or(u32::MAX);
        let total = u32::try_from(self.total_steps.max(1)).unwrap_or(u32::MAX);
        let percentage = (f64::from(correct) / f64::from(total) * 100.0).round() as u8;
        QuizScore {
            correct,
            total,
            percentage,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
