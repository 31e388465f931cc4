use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("unknown practice mode: {0}")]
    UnknownMode(String),
}

/// How a question is being practiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
    Mcq,
    Text,
    Guided,
    Mock,
}

impl PracticeMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PracticeMode::Mcq => "mcq",
            PracticeMode::Text => "text",
            PracticeMode::Guided => "guided",
            PracticeMode::Mock => "mock",
        }
    }
}

impl FromStr for PracticeMode {
    type Err = AnswerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(PracticeMode::Mcq),
            "text" => Ok(PracticeMode::Text),
            "guided" => Ok(PracticeMode::Guided),
            "mock" => Ok(PracticeMode::Mock),
            other => Err(AnswerError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured outline answer: section name to bullet points, in section order.
pub type Outline = BTreeMap<String, Vec<String>>;

/// A learner's answer body.
///
/// Tagged at the type level so storage and scoring never have to sniff the
/// shape of a serialized blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    Outline(Outline),
}

impl Answer {
    /// Empty free-text answer, the starting state of every attempt.
    #[must_use]
    pub fn empty() -> Self {
        Answer::Text(String::new())
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Outline(outline) => {
                outline.values().all(|points| points.is_empty())
            }
        }
    }

    /// Flat text rendering, used for drafts and evaluation prompts.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Outline(outline) => outline
                .iter()
                .map(|(section, points)| {
                    let bullets = points
                        .iter()
                        .map(|p| format!("  - {p}"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    format!("{section}:\n{bullets}")
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl Default for Answer {
    fn default() -> Self {
        Answer::empty()
    }
}

/// One recorded answer to a sub-question of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAnswer {
    pub sub_question: usize,
    pub selected_option: usize,
    pub correct: bool,
}

/// Evaluation payload attached to a submission by an external grader.
///
/// `score` is the grader's 1-10 rubric score; mastery updates scale it to
/// 0-100 before recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_renders_sections_with_bullets() {
        let mut outline = Outline::new();
        outline.insert(
            "Clarify".into(),
            vec!["Who is the user?".into(), "What is the goal?".into()],
        );
        outline.insert("Metrics".into(), vec!["DAU".into()]);

        let text = Answer::Outline(outline).as_text();
        assert!(text.starts_with("Clarify:\n  - Who is the user?"));
        assert!(text.contains("Metrics:\n  - DAU"));
    }

    #[test]
    fn blank_detection_covers_both_shapes() {
        assert!(Answer::Text("  ".into()).is_blank());
        assert!(!Answer::Text("draft".into()).is_blank());

        let mut outline = Outline::new();
        outline.insert("Clarify".into(), Vec::new());
        assert!(Answer::Outline(outline.clone()).is_blank());
        outline.insert("Metrics".into(), vec!["DAU".into()]);
        assert!(!Answer::Outline(outline).is_blank());
    }

    #[test]
    fn mode_round_trips_via_str() {
        for mode in [
            PracticeMode::Mcq,
            PracticeMode::Text,
            PracticeMode::Guided,
            PracticeMode::Mock,
        ] {
            assert_eq!(mode.as_str().parse(), Ok(mode));
        }
    }
}
