use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::question::{FrameworkName, PatternName, QuestionCategory};

/// Aggregated learning state for one user; the single row the aggregator
/// mutates after every completed question.
///
/// Counters only grow (except via [`crate::progress::reset`]) and mastery
/// values only ratchet upward, so any two snapshots of the same user are
/// ordered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProgress {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_practice_date: Option<NaiveDate>,

    pub total_questions_completed: u32,
    pub total_mcq_completed: u32,
    pub total_text_completed: u32,
    pub category_progress: BTreeMap<QuestionCategory, u32>,

    /// Highest score ever achieved per framework, 0-100.
    pub framework_mastery: BTreeMap<FrameworkName, u8>,
    /// Highest score ever achieved per pattern, 0-100.
    pub pattern_mastery: BTreeMap<PatternName, u8>,

    /// Composite 0-100 readiness estimate; always derived, never patched.
    pub readiness_score: u8,
    pub readiness_by_category: BTreeMap<QuestionCategory, u8>,

    /// Free-tier usage of graded text questions in the current week.
    pub weekly_questions_used: u32,
    pub week_reset_date: Option<NaiveDate>,
}

impl UserProgress {
    /// Fresh progress row, created lazily on a user's first read.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion count for a category, 0 when never practiced.
    #[must_use]
    pub fn category_count(&self, category: QuestionCategory) -> u32 {
        self.category_progress.get(&category).copied().unwrap_or(0)
    }

    /// Recorded framework mastery, 0 when never scored.
    #[must_use]
    pub fn framework_score(&self, framework: FrameworkName) -> u8 {
        self.framework_mastery
            .get(&framework)
            .copied()
            .unwrap_or(0)
    }

    /// Recorded pattern mastery, 0 when never scored.
    #[must_use]
    pub fn pattern_score(&self, pattern: PatternName) -> u8 {
        self.pattern_mastery.get(&pattern).copied().unwrap_or(0)
    }
}
