//! Declarative achievement rules over a [`UserProgress`] snapshot.
//!
//! "Unlocked" is derived state: every call re-evaluates the rule list
//! against the snapshot it is given. Callers that want to announce *new*
//! unlocks persist the previously seen id set themselves and diff with
//! [`newly_unlocked`].

use std::collections::BTreeSet;

use crate::model::{FrameworkName, UserProgress};

/// Achievement rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }
}

/// One achievement rule: a stable id, display copy, and a pure predicate.
///
/// The predicate takes an immutable snapshot, so evaluation can never
/// observe a partially applied progress update.
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub tier: Tier,
    pub condition: fn(&UserProgress) -> bool,
}

const FRAMEWORK_MASTERY_BAR: u8 = 80;
const CORE_FRAMEWORKS: [FrameworkName; 4] = [
    FrameworkName::Circles,
    FrameworkName::Star,
    FrameworkName::Metrics,
    FrameworkName::Prioritization,
];

/// The full rule list, ordered roughly easiest to hardest.
pub static ACHIEVEMENTS: &[AchievementDef] = &[
    // Streaks
    AchievementDef {
        id: "streak_3",
        title: "On Fire",
        description: "Reach a 3-day streak",
        tier: Tier::Bronze,
        condition: |p| p.current_streak >= 3,
    },
    AchievementDef {
        id: "streak_7",
        title: "Week Warrior",
        description: "Reach a 7-day streak",
        tier: Tier::Silver,
        condition: |p| p.current_streak >= 7,
    },
    AchievementDef {
        id: "streak_14",
        title: "Two Week Titan",
        description: "Reach a 14-day streak",
        tier: Tier::Gold,
        condition: |p| p.current_streak >= 14,
    },
    AchievementDef {
        id: "streak_30",
        title: "Monthly Master",
        description: "Reach a 30-day streak",
        tier: Tier::Platinum,
        condition: |p| p.current_streak >= 30,
    },
    // Question totals
    AchievementDef {
        id: "first_step",
        title: "First Step",
        description: "Complete your first practice question",
        tier: Tier::Bronze,
        condition: |p| p.total_questions_completed >= 1,
    },
    AchievementDef {
        id: "getting_started",
        title: "Getting Started",
        description: "Complete 5 questions",
        tier: Tier::Bronze,
        condition: |p| p.total_questions_completed >= 5,
    },
    AchievementDef {
        id: "dedicated",
        title: "Dedicated",
        description: "Complete 10 questions",
        tier: Tier::Silver,
        condition: |p| p.total_questions_completed >= 10,
    },
    AchievementDef {
        id: "serious_practice",
        title: "Serious Practice",
        description: "Complete 25 questions",
        tier: Tier::Silver,
        condition: |p| p.total_questions_completed >= 25,
    },
    AchievementDef {
        id: "expert",
        title: "Expert",
        description: "Complete 50 questions",
        tier: Tier::Gold,
        condition: |p| p.total_questions_completed >= 50,
    },
    AchievementDef {
        id: "master",
        title: "PM Master",
        description: "Complete 100 questions",
        tier: Tier::Platinum,
        condition: |p| p.total_questions_completed >= 100,
    },
    // Text practice
    AchievementDef {
        id: "writer",
        title: "Wordsmith",
        description: "Complete 5 text-based answers",
        tier: Tier::Bronze,
        condition: |p| p.total_text_completed >= 5,
    },
    AchievementDef {
        id: "outline_pro",
        title: "Outline Pro",
        description: "Complete 15 text-based answers",
        tier: Tier::Silver,
        condition: |p| p.total_text_completed >= 15,
    },
    // MCQ practice
    AchievementDef {
        id: "quiz_taker",
        title: "Quiz Taker",
        description: "Complete 10 MCQ questions",
        tier: Tier::Bronze,
        condition: |p| p.total_mcq_completed >= 10,
    },
    AchievementDef {
        id: "quiz_master",
        title: "Quiz Master",
        description: "Complete 30 MCQ questions",
        tier: Tier::Silver,
        condition: |p| p.total_mcq_completed >= 30,
    },
    // Framework mastery
    AchievementDef {
        id: "circles_master",
        title: "CIRCLES Expert",
        description: "Reach 80% mastery in CIRCLES",
        tier: Tier::Silver,
        condition: |p| p.framework_score(FrameworkName::Circles) >= FRAMEWORK_MASTERY_BAR,
    },
    AchievementDef {
        id: "star_master",
        title: "STAR Expert",
        description: "Reach 80% mastery in STAR",
        tier: Tier::Silver,
        condition: |p| p.framework_score(FrameworkName::Star) >= FRAMEWORK_MASTERY_BAR,
    },
    AchievementDef {
        id: "metrics_master",
        title: "METRICS Expert",
        description: "Reach 80% mastery in METRICS",
        tier: Tier::Silver,
        condition: |p| p.framework_score(FrameworkName::Metrics) >= FRAMEWORK_MASTERY_BAR,
    },
    AchievementDef {
        id: "framework_master",
        title: "Framework Master",
        description: "Reach 80% in all core frameworks",
        tier: Tier::Gold,
        condition: |p| {
            CORE_FRAMEWORKS
                .iter()
                .all(|&fw| p.framework_score(fw) >= FRAMEWORK_MASTERY_BAR)
        },
    },
    // Readiness
    AchievementDef {
        id: "halfway_there",
        title: "Halfway There",
        description: "Reach 50% interview readiness",
        tier: Tier::Silver,
        condition: |p| p.readiness_score >= 50,
    },
    AchievementDef {
        id: "interview_ready",
        title: "Interview Ready",
        description: "Reach 80% interview readiness",
        tier: Tier::Gold,
        condition: |p| p.readiness_score >= 80,
    },
];

/// Every achievement whose predicate holds for the snapshot.
#[must_use]
pub fn unlocked(progress: &UserProgress) -> Vec<&'static AchievementDef> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| (a.condition)(progress))
        .collect()
}

/// Unlocked achievements not present in the previously seen id set.
///
/// The caller persists `previous` between evaluations so repeats are not
/// re-announced.
#[must_use]
pub fn newly_unlocked(
    progress: &UserProgress,
    previous: &BTreeSet<String>,
) -> Vec<&'static AchievementDef> {
    unlocked(progress)
        .into_iter()
        .filter(|a| !previous.contains(a.id))
        .collect()
}

/// The first still-locked achievement in list order, if any.
#[must_use]
pub fn next_locked(progress: &UserProgress) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| !(a.condition)(progress))
}

/// Percent of all achievements currently unlocked, rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn completion_percent(progress: &UserProgress) -> u8 {
    let total = ACHIEVEMENTS.len();
    if total == 0 {
        return 0;
    }
    let count = unlocked(progress).len();
    (count as f64 / total as f64 * 100.0).round() as u8
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
