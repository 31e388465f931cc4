//! Practice session lifecycle: single-question attempts and quiz runs.

mod engine;
mod quiz;

pub use engine::{PracticeEngine, SessionHandle};
pub use quiz::{QuizAnswer, QuizScore, QuizState};
