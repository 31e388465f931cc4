use std::collections::BTreeSet;

use chrono::Duration;
use prep_core::model::{
    Answer, AnswerOption, Difficulty, Feedback, FrameworkName, PracticeMode, Question,
    QuestionCategory, QuestionId, Skill, SubAnswer, SubQuestion, UserId, UserProgress,
};
use prep_core::time::fixed_now;
use storage::repository::{
    DraftRepository, ProgressRepository, QuestionRepository, SessionRepository, StorageError,
    SubmissionRecord, UnlockRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn mcq_question() -> Question {
    Question {
        id: QuestionId::generate(),
        text: "Pick the right clarifying question".into(),
        category: QuestionCategory::ProductSense,
        difficulty: Difficulty::Beginner,
        skill: Some(Skill::Framework(FrameworkName::Circles)),
        sub_questions: vec![SubQuestion {
            prompt: "Which comes first in CIRCLES?".into(),
            options: vec![
                AnswerOption {
                    text: "Comprehend the situation".into(),
                    correct: true,
                    explanation: "C is the first step".into(),
                },
                AnswerOption {
                    text: "List solutions".into(),
                    correct: false,
                    explanation: String::new(),
                },
            ],
        }],
        expert_answer: None,
    }
}

fn text_question() -> Question {
    Question {
        id: QuestionId::generate(),
        text: "How would you improve Spotify's onboarding?".into(),
        category: QuestionCategory::ProductSense,
        difficulty: Difficulty::Intermediate,
        skill: Some(Skill::Framework(FrameworkName::Circles)),
        sub_questions: Vec::new(),
        expert_answer: Some("Start from the activation funnel.".into()),
    }
}

#[tokio::test]
async fn question_roundtrip_preserves_options_and_skill() {
    let repo = connect("memdb_question_roundtrip").await;
    let question = mcq_question();
    repo.upsert_question(&question).await.unwrap();

    let fetched = repo.get_question(question.id).await.unwrap();
    assert_eq!(fetched, question);

    let listed = repo.list_questions(10).await.unwrap();
    assert_eq!(listed.len(), 1);

    let missing = repo.get_question(QuestionId::generate()).await;
    assert!(matches!(missing, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn session_submit_roundtrip_and_resubmit_stays_completed() {
    let repo = connect("memdb_session_submit").await;
    let question = mcq_question();
    repo.upsert_question(&question).await.unwrap();

    let user = UserId::generate();
    let session_id = repo
        .create_session(user, question.id, PracticeMode::Mcq, fixed_now())
        .await
        .unwrap();

    let created = repo.get_session(session_id).await.unwrap();
    assert!(!created.completed);
    assert_eq!(created.mode, PracticeMode::Mcq);

    let submission = SubmissionRecord {
        answer: Answer::empty(),
        elapsed_seconds: 42,
        sub_answers: vec![SubAnswer {
            sub_question: 0,
            selected_option: 0,
            correct: true,
        }],
        correct: Some(true),
        feedback: Some(Feedback {
            score: 8,
            strengths: vec!["clear structure".into()],
            improvements: vec![],
        }),
    };
    repo.submit_answer(session_id, &submission).await.unwrap();

    let row = repo.get_session(session_id).await.unwrap();
    assert!(row.completed);
    assert_eq!(row.elapsed_seconds, 42);
    assert_eq!(row.sub_answers, submission.sub_answers);
    assert_eq!(row.correct, Some(true));
    assert_eq!(row.feedback, submission.feedback);

    // resubmission replaces the payload but never un-completes
    let revised = SubmissionRecord {
        answer: Answer::Text("revised".into()),
        elapsed_seconds: 60,
        sub_answers: Vec::new(),
        correct: None,
        feedback: None,
    };
    repo.submit_answer(session_id, &revised).await.unwrap();
    let row = repo.get_session(session_id).await.unwrap();
    assert!(row.completed);
    assert_eq!(row.answer, Answer::Text("revised".into()));
}

#[tokio::test]
async fn create_session_rejects_unknown_question() {
    let repo = connect("memdb_session_unknown_question").await;
    let err = repo
        .create_session(
            UserId::generate(),
            QuestionId::generate(),
            PracticeMode::Text,
            fixed_now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn recent_attempts_joins_category_newest_first() {
    let repo = connect("memdb_recent_attempts").await;
    let question = text_question();
    repo.upsert_question(&question).await.unwrap();

    let user = UserId::generate();
    let older = fixed_now();
    let newer = older + Duration::hours(2);
    let first = repo
        .create_session(user, question.id, PracticeMode::Text, older)
        .await
        .unwrap();
    let second = repo
        .create_session(user, question.id, PracticeMode::Text, newer)
        .await
        .unwrap();
    for (id, correct) in [(first, Some(false)), (second, Some(true))] {
        repo.submit_answer(
            id,
            &SubmissionRecord {
                answer: Answer::Text("done".into()),
                elapsed_seconds: 10,
                sub_answers: Vec::new(),
                correct,
                feedback: None,
            },
        )
        .await
        .unwrap();
    }

    let attempts = repo.recent_attempts(user, 10).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].created_at, newer);
    assert_eq!(attempts[0].correct, Some(true));
    assert_eq!(attempts[0].category, QuestionCategory::ProductSense);

    let other_user = repo.recent_attempts(UserId::generate(), 10).await.unwrap();
    assert!(other_user.is_empty());
}

#[tokio::test]
async fn draft_upsert_fetch_delete() {
    let repo = connect("memdb_drafts").await;
    let user = UserId::generate();
    let question = QuestionId::generate();

    assert_eq!(repo.get_draft(user, question).await.unwrap(), None);

    repo.upsert_draft(user, question, "first pass").await.unwrap();
    repo.upsert_draft(user, question, "second pass").await.unwrap();
    assert_eq!(
        repo.get_draft(user, question).await.unwrap().as_deref(),
        Some("second pass")
    );

    repo.delete_draft(user, question).await.unwrap();
    assert_eq!(repo.get_draft(user, question).await.unwrap(), None);
    repo.delete_draft(user, question).await.unwrap();
}

#[tokio::test]
async fn progress_row_roundtrips_maps_and_dates() {
    let repo = connect("memdb_progress").await;
    let user = UserId::generate();

    assert_eq!(repo.get_progress(user).await.unwrap(), None);

    let mut progress = UserProgress::new();
    progress.current_streak = 4;
    progress.longest_streak = 9;
    progress.last_practice_date = Some(fixed_now().date_naive());
    progress.total_questions_completed = 17;
    progress.total_mcq_completed = 11;
    progress.total_text_completed = 6;
    progress
        .category_progress
        .insert(QuestionCategory::ProductSense, 8);
    progress
        .framework_mastery
        .insert(FrameworkName::Circles, 75);
    progress.readiness_score = 38;
    progress
        .readiness_by_category
        .insert(QuestionCategory::ProductSense, 80);
    progress.weekly_questions_used = 2;
    progress.week_reset_date = Some(fixed_now().date_naive());

    repo.upsert_progress(user, &progress).await.unwrap();
    assert_eq!(repo.get_progress(user).await.unwrap(), Some(progress.clone()));

    progress.current_streak = 5;
    repo.upsert_progress(user, &progress).await.unwrap();
    assert_eq!(repo.get_progress(user).await.unwrap(), Some(progress));
}

#[tokio::test]
async fn unlock_set_roundtrips() {
    let repo = connect("memdb_unlocks").await;
    let user = UserId::generate();

    assert!(repo.get_unlocked_ids(user).await.unwrap().is_empty());

    let ids: BTreeSet<String> = ["first_step".to_string(), "streak_3".to_string()].into();
    repo.set_unlocked_ids(user, &ids).await.unwrap();
    assert_eq!(repo.get_unlocked_ids(user).await.unwrap(), ids);
}
