mod answer;
mod attempt;
mod ids;
mod progress;
mod question;

pub use answer::{Answer, AnswerError, Feedback, Outline, PracticeMode, SubAnswer};
pub use attempt::AttemptRecord;
pub use ids::{QuestionId, SessionId, UserId};
pub use progress::UserProgress;
pub use question::{
    AnswerOption, Difficulty, FrameworkName, PatternName, Question, QuestionCategory,
    QuestionError, Skill, SubQuestion,
};
