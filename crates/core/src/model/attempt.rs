use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::answer::{PracticeMode, SubAnswer};
use crate::model::ids::QuestionId;
use crate::model::question::QuestionCategory;

/// Snapshot of a persisted practice session joined with its question's
/// category, as returned by the recent-attempts query.
///
/// This is the input to weak-area detection; it deliberately carries only
/// what that computation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub question_id: QuestionId,
    pub category: QuestionCategory,
    pub mode: PracticeMode,
    pub completed: bool,
    /// Verdict for non-MCQ modes; `None` when never graded.
    pub correct: Option<bool>,
    pub sub_answers: Vec<SubAnswer>,
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Whether the whole attempt counts as correct.
    ///
    /// MCQ attempts require every recorded sub-answer to be correct;
    /// other modes fall back to the stored verdict.
    #[must_use]
    pub fn was_fully_correct(&self) -> bool {
        if self.sub_answers.is_empty() {
            self.correct == Some(true)
        } else {
            self.sub_answers.iter().all(|a| a.correct)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn attempt(sub_answers: Vec<SubAnswer>, correct: Option<bool>) -> AttemptRecord {
        AttemptRecord {
            question_id: QuestionId::generate(),
            category: QuestionCategory::Execution,
            mode: PracticeMode::Mcq,
            completed: true,
            correct,
            sub_answers,
            created_at: fixed_now(),
        }
    }

    #[test]
    fn mcq_attempt_requires_all_sub_answers_correct() {
        let all_right = attempt(
            vec![
                SubAnswer { sub_question: 0, selected_option: 1, correct: true },
                SubAnswer { sub_question: 1, selected_option: 0, correct: true },
            ],
            None,
        );
        assert!(all_right.was_fully_correct());

        let one_wrong = attempt(
            vec![
                SubAnswer { sub_question: 0, selected_option: 1, correct: true },
                SubAnswer { sub_question: 1, selected_option: 2, correct: false },
            ],
            None,
        );
        assert!(!one_wrong.was_fully_correct());
    }

    #[test]
    fn text_attempt_uses_stored_verdict() {
        assert!(attempt(Vec::new(), Some(true)).was_fully_correct());
        assert!(!attempt(Vec::new(), Some(false)).was_fully_correct());
        assert!(!attempt(Vec::new(), None).was_fully_correct());
    }
}
