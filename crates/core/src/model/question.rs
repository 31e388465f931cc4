use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    BlankText,

    #[error("sub-question {index} has no options")]
    EmptySubQuestion { index: usize },

    #[error("sub-question {index} has no correct option")]
    NoCorrectOption { index: usize },

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

//
// ─── CATEGORIES & SKILLS ───────────────────────────────────────────────────────
//

/// Fixed set of interview question categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    ProductSense,
    Execution,
    Strategy,
    Behavioral,
    Technical,
    Estimation,
    Pricing,
    AbTesting,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 8] = [
        QuestionCategory::ProductSense,
        QuestionCategory::Execution,
        QuestionCategory::Strategy,
        QuestionCategory::Behavioral,
        QuestionCategory::Technical,
        QuestionCategory::Estimation,
        QuestionCategory::Pricing,
        QuestionCategory::AbTesting,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionCategory::ProductSense => "product_sense",
            QuestionCategory::Execution => "execution",
            QuestionCategory::Strategy => "strategy",
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Technical => "technical",
            QuestionCategory::Estimation => "estimation",
            QuestionCategory::Pricing => "pricing",
            QuestionCategory::AbTesting => "ab_testing",
        }
    }
}

impl FromStr for QuestionCategory {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product_sense" => Ok(QuestionCategory::ProductSense),
            "execution" => Ok(QuestionCategory::Execution),
            "strategy" => Ok(QuestionCategory::Strategy),
            "behavioral" => Ok(QuestionCategory::Behavioral),
            "technical" => Ok(QuestionCategory::Technical),
            "estimation" => Ok(QuestionCategory::Estimation),
            "pricing" => Ok(QuestionCategory::Pricing),
            "ab_testing" => Ok(QuestionCategory::AbTesting),
            other => Err(QuestionError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer frameworks taught by the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameworkName {
    Circles,
    Star,
    Metrics,
    Prioritization,
    ProblemStatement,
    Swot,
    PorterFiveForces,
    BlueOcean,
}

impl FrameworkName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FrameworkName::Circles => "CIRCLES",
            FrameworkName::Star => "STAR",
            FrameworkName::Metrics => "METRICS",
            FrameworkName::Prioritization => "PRIORITIZATION",
            FrameworkName::ProblemStatement => "PROBLEM_STATEMENT",
            FrameworkName::Swot => "SWOT",
            FrameworkName::PorterFiveForces => "PORTER_FIVE_FORCES",
            FrameworkName::BlueOcean => "BLUE_OCEAN",
        }
    }
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurring question patterns tracked for mastery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternName {
    DesignXForY,
    ImproveX,
    MetricsForX,
    InvestigateDrop,
    Strategy,
    BehavioralStar,
}

impl PatternName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PatternName::DesignXForY => "design_x_for_y",
            PatternName::ImproveX => "improve_x",
            PatternName::MetricsForX => "metrics_for_x",
            PatternName::InvestigateDrop => "investigate_drop",
            PatternName::Strategy => "strategy",
            PatternName::BehavioralStar => "behavioral_star",
        }
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The skill a question exercises; the key mastery scores are recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Framework(FrameworkName),
    Pattern(PatternName),
}

/// Coarse difficulty rating for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

//
// ─── QUESTION CONTENT ──────────────────────────────────────────────────────────
//

/// One selectable option of a multiple-choice sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub correct: bool,
    #[serde(default)]
    pub explanation: String,
}

/// One prompt within a multi-part MCQ question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

/// Immutable content unit served to learners.
///
/// Owned by content authoring; the practice core only reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skill: Option<Skill>,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
    #[serde(default)]
    pub expert_answer: Option<String>,
}

impl Question {
    /// Number of flattened quiz steps this question contributes.
    ///
    /// A question with no sub-questions still takes one step.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.sub_questions.len().max(1)
    }

    /// Index of the last sub-question, or 0 when there are none.
    #[must_use]
    pub fn last_sub_index(&self) -> usize {
        self.sub_questions.len().saturating_sub(1)
    }

    /// Checks the content is usable for a practice attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for blank text, an option-less sub-question,
    /// or a sub-question where nothing is marked correct.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::BlankText);
        }
        for (index, sub) in self.sub_questions.iter().enumerate() {
            if sub.options.is_empty() {
                return Err(QuestionError::EmptySubQuestion { index });
            }
            if !sub.options.iter().any(|o| o.correct) {
                return Err(QuestionError::NoCorrectOption { index });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(prompt: &str, correct_first: bool) -> SubQuestion {
        SubQuestion {
            prompt: prompt.to_string(),
            options: vec![
                AnswerOption {
                    text: "A".into(),
                    correct: correct_first,
                    explanation: String::new(),
                },
                AnswerOption {
                    text: "B".into(),
                    correct: !correct_first,
                    explanation: String::new(),
                },
            ],
        }
    }

    fn question(subs: Vec<SubQuestion>) -> Question {
        Question {
            id: QuestionId::generate(),
            text: "How would you improve search?".into(),
            category: QuestionCategory::ProductSense,
            difficulty: Difficulty::Intermediate,
            skill: Some(Skill::Framework(FrameworkName::Circles)),
            sub_questions: subs,
            expert_answer: None,
        }
    }

    #[test]
    fn step_count_is_one_without_sub_questions() {
        let q = question(Vec::new());
        assert_eq!(q.step_count(), 1);
        assert_eq!(q.last_sub_index(), 0);
    }

    #[test]
    fn step_count_matches_sub_questions() {
        let q = question(vec![sub("first", true), sub("second", false)]);
        assert_eq!(q.step_count(), 2);
        assert_eq!(q.last_sub_index(), 1);
    }

    #[test]
    fn blank_text_fails_validation() {
        let mut q = question(Vec::new());
        q.text = "   ".into();
        assert_eq!(q.validate(), Err(QuestionError::BlankText));
    }

    #[test]
    fn sub_question_without_correct_option_fails_validation() {
        let mut q = question(vec![sub("first", true)]);
        for option in &mut q.sub_questions[0].options {
            option.correct = false;
        }
        assert_eq!(
            q.validate(),
            Err(QuestionError::NoCorrectOption { index: 0 })
        );
    }

    #[test]
    fn category_round_trips_via_str() {
        for category in QuestionCategory::ALL {
            assert_eq!(category.as_str().parse(), Ok(category));
        }
    }
}
