#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod app_services;
pub mod error;
pub mod feedback_service;
pub mod practice;
pub mod progress_service;

pub use prep_core::Clock;

pub use error::{
    AchievementError, AppServicesError, FeedbackError, PracticeError, ProgressError,
};

pub use achievement_service::AchievementService;
pub use app_services::AppServices;
pub use feedback_service::{FeedbackConfig, FeedbackService};
pub use practice::{PracticeEngine, QuizAnswer, QuizScore, QuizState, SessionHandle};
pub use progress_service::ProgressService;
