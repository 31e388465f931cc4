//! Pure aggregation over a [`UserProgress`] snapshot: streaks, mastery,
//! readiness, and weak-area detection.
//!
//! Everything here is deterministic and side-effect free; persistence and
//! clocks live in the services layer. Callers pass in `today` as a calendar
//! date so streak math never sees timezones or time-of-day.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::model::{
    AttemptRecord, PracticeMode, QuestionCategory, Skill, UserProgress,
};

/// A category counts as fully covered after this many completions.
pub const CATEGORY_COMPLETION_TARGET: u32 = 10;

/// Total completions at which the practice-volume component maxes out.
pub const VOLUME_TARGET: u32 = 50;

/// Minimum attempts in a category before it can be flagged weak.
pub const WEAK_AREA_MIN_ATTEMPTS: u32 = 3;

/// Success rate (percent) below which a category is weak.
pub const WEAK_AREA_THRESHOLD: u8 = 70;

/// Graded text questions allowed per week on the free tier.
pub const FREE_WEEKLY_LIMIT: u32 = 3;

const FRAMEWORK_WEIGHT: f64 = 0.4;
const PATTERN_WEIGHT: f64 = 0.3;
const CATEGORY_WEIGHT: f64 = 0.2;
const VOLUME_WEIGHT: f64 = 0.1;

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

/// Applies one practice day to the streak counters.
///
/// Calendar-date transitions: same day leaves the streak alone, the next
/// day extends it, any gap resets it to 1. `longest_streak` only ever
/// ratchets upward.
pub fn advance_streak(progress: &mut UserProgress, today: NaiveDate) {
    match progress.last_practice_date {
        None => progress.current_streak = 1,
        Some(last) => match (today - last).num_days() {
            0 => {}
            1 => progress.current_streak += 1,
            _ => progress.current_streak = 1,
        },
    }

    progress.longest_streak = progress.longest_streak.max(progress.current_streak);
    progress.last_practice_date = Some(today);
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

/// Records one fully completed question: counters, category progress,
/// weekly usage, streak, and a fresh readiness score.
pub fn record_completion(
    progress: &mut UserProgress,
    mode: PracticeMode,
    category: QuestionCategory,
    today: NaiveDate,
) {
    progress.total_questions_completed += 1;
    match mode {
        PracticeMode::Mcq => progress.total_mcq_completed += 1,
        PracticeMode::Text => progress.total_text_completed += 1,
        PracticeMode::Guided | PracticeMode::Mock => {}
    }

    *progress.category_progress.entry(category).or_insert(0) += 1;

    roll_week(progress, today);
    if mode == PracticeMode::Text {
        progress.weekly_questions_used += 1;
    }

    advance_streak(progress, today);
    recompute_readiness(progress);
}

//
// ─── MASTERY ───────────────────────────────────────────────────────────────────
//

/// Ratchets the mastery score for a skill: a strong attempt raises it
/// permanently, a later weak attempt never lowers it.
///
/// `score` is expected pre-scaled to 0-100; values above 100 are clamped.
pub fn apply_mastery(progress: &mut UserProgress, skill: Skill, score: u8) {
    let score = score.min(100);
    match skill {
        Skill::Framework(name) => {
            let entry = progress.framework_mastery.entry(name).or_insert(0);
            *entry = (*entry).max(score);
        }
        Skill::Pattern(name) => {
            let entry = progress.pattern_mastery.entry(name).or_insert(0);
            *entry = (*entry).max(score);
        }
    }
    recompute_readiness(progress);
}

//
// ─── READINESS ─────────────────────────────────────────────────────────────────
//

/// Readiness as a weighted sum of four 0-100 components:
/// framework-mastery average (0.4), pattern-mastery average (0.3),
/// category-completion average (0.2), and practice volume (0.1).
///
/// Recomputed from scratch on every call; there is no incremental state
/// that could drift.
#[must_use]
pub fn readiness_score(progress: &UserProgress) -> u8 {
    let framework_avg = mean_u8(progress.framework_mastery.values().copied());
    let pattern_avg = mean_u8(progress.pattern_mastery.values().copied());
    let category_avg = mean_f64(
        progress
            .category_progress
            .values()
            .map(|&count| category_subscore(count)),
    );
    let volume = capped_ratio(progress.total_questions_completed, VOLUME_TARGET);

    let weighted = framework_avg * FRAMEWORK_WEIGHT
        + pattern_avg * PATTERN_WEIGHT
        + category_avg * CATEGORY_WEIGHT
        + volume * VOLUME_WEIGHT;

    round_to_score(weighted)
}

/// Per-category readiness sub-scores (completion progress toward the
/// category target), for practiced categories only.
#[must_use]
pub fn readiness_by_category(progress: &UserProgress) -> BTreeMap<QuestionCategory, u8> {
    progress
        .category_progress
        .iter()
        .map(|(&category, &count)| (category, round_to_score(category_subscore(count))))
        .collect()
}

/// Overwrites the derived readiness fields from the rest of the snapshot.
pub fn recompute_readiness(progress: &mut UserProgress) {
    progress.readiness_score = readiness_score(progress);
    progress.readiness_by_category = readiness_by_category(progress);
}

fn category_subscore(count: u32) -> f64 {
    capped_ratio(count, CATEGORY_COMPLETION_TARGET)
}

fn capped_ratio(count: u32, target: u32) -> f64 {
    (f64::from(count) / f64::from(target) * 100.0).min(100.0)
}

fn mean_u8(values: impl Iterator<Item = u8>) -> f64 {
    mean_f64(values.map(f64::from))
}

fn mean_f64(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}

// Weighted components are each bounded by 100, so the sum fits in u8.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

//
// ─── WEAK AREAS ────────────────────────────────────────────────────────────────
//

/// A category where recent attempts succeed less often than the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakArea {
    pub category: QuestionCategory,
    /// Rounded success percentage over the considered attempts.
    pub success_rate: u8,
    pub attempts: u32,
}

/// Classifies weak categories from recent completed attempts.
///
/// Categories with fewer than [`WEAK_AREA_MIN_ATTEMPTS`] completions are
/// skipped so one unlucky attempt cannot flag a category. Results are
/// sorted worst first.
#[must_use]
pub fn weak_areas(attempts: &[AttemptRecord]) -> Vec<WeakArea> {
    let mut stats: BTreeMap<QuestionCategory, (u32, u32)> = BTreeMap::new();
    for attempt in attempts.iter().filter(|a| a.completed) {
        let entry = stats.entry(attempt.category).or_insert((0, 0));
        entry.1 += 1;
        if attempt.was_fully_correct() {
            entry.0 += 1;
        }
    }

    let mut weak: Vec<WeakArea> = stats
        .into_iter()
        .filter(|&(_, (_, total))| total >= WEAK_AREA_MIN_ATTEMPTS)
        .filter_map(|(category, (correct, total))| {
            // threshold compares the exact rate; rounding is display-only
            let rate = f64::from(correct) / f64::from(total) * 100.0;
            (rate < f64::from(WEAK_AREA_THRESHOLD)).then_some(WeakArea {
                category,
                success_rate: round_to_score(rate),
                attempts: total,
            })
        })
        .collect();

    weak.sort_by_key(|area| area.success_rate);
    weak
}

//
// ─── WEEKLY LIMIT ──────────────────────────────────────────────────────────────
//

/// Free-tier usage of graded text questions for the current week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyUsage {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub can_practice: bool,
}

/// Reports weekly usage as of `today`, treating an elapsed week as reset
/// without mutating the snapshot.
#[must_use]
pub fn weekly_usage(progress: &UserProgress, today: NaiveDate) -> WeeklyUsage {
    let used = if week_elapsed(progress, today) {
        0
    } else {
        progress.weekly_questions_used
    };
    let remaining = FREE_WEEKLY_LIMIT.saturating_sub(used);
    WeeklyUsage {
        used,
        limit: FREE_WEEKLY_LIMIT,
        remaining,
        can_practice: remaining > 0,
    }
}

fn roll_week(progress: &mut UserProgress, today: NaiveDate) {
    if week_elapsed(progress, today) {
        progress.weekly_questions_used = 0;
        progress.week_reset_date = Some(today);
    }
}

fn week_elapsed(progress: &UserProgress, today: NaiveDate) -> bool {
    match progress.week_reset_date {
        None => true,
        Some(anchor) => (today - anchor).num_days() >= 7,
    }
}

//
// ─── RESET ─────────────────────────────────────────────────────────────────────
//

/// Account reset: the only operation allowed to decrease any counter.
pub fn reset(progress: &mut UserProgress) {
    *progress = UserProgress::new();
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
