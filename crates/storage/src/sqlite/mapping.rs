use prep_core::model::{
    Answer, Difficulty, PracticeMode, Question, QuestionCategory, QuestionId, SessionId, Skill,
    SubAnswer, SubQuestion, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use uuid::Uuid;

use crate::repository::{SessionRow, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn uuid_from_str(field: &'static str, s: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(s).map_err(|_| StorageError::Serialization(format!("invalid {field}: {s}")))
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    Ok(UserId::new(uuid_from_str("user_id", s)?))
}

pub(crate) fn question_id_from_str(s: &str) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(uuid_from_str("question_id", s)?))
}

pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(uuid_from_str("session_id", s)?))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, StorageError> {
    serde_json::from_str(s).map_err(ser)
}

pub(crate) fn parse_category(s: &str) -> Result<QuestionCategory, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn parse_mode(s: &str) -> Result<PracticeMode, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "beginner" => Ok(Difficulty::Beginner),
        "intermediate" => Ok(Difficulty::Intermediate),
        "advanced" => Ok(Difficulty::Advanced),
        _ => Err(StorageError::Serialization(format!(
            "invalid difficulty: {s}"
        ))),
    }
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let category_str: String = row.try_get("category").map_err(ser)?;
    let difficulty_str: String = row.try_get("difficulty").map_err(ser)?;

    let skill: Option<Skill> = row
        .try_get::<Option<String>, _>("skill")
        .map_err(ser)?
        .map(|s| from_json(&s))
        .transpose()?;

    let sub_questions: Vec<SubQuestion> =
        from_json(&row.try_get::<String, _>("sub_questions").map_err(ser)?)?;

    Ok(Question {
        id: question_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?,
        text: row.try_get("text").map_err(ser)?,
        category: parse_category(&category_str)?,
        difficulty: parse_difficulty(&difficulty_str)?,
        skill,
        sub_questions,
        expert_answer: row.try_get("expert_answer").map_err(ser)?,
    })
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRow, StorageError> {
    let answer: Answer = from_json(&row.try_get::<String, _>("answer").map_err(ser)?)?;
    let sub_answers: Vec<SubAnswer> =
        from_json(&row.try_get::<String, _>("sub_answers").map_err(ser)?)?;
    let feedback = row
        .try_get::<Option<String>, _>("feedback")
        .map_err(ser)?
        .map(|s| from_json(&s))
        .transpose()?;

    let mode_str: String = row.try_get("mode").map_err(ser)?;
    let elapsed: i64 = row.try_get("elapsed_seconds").map_err(ser)?;

    Ok(SessionRow {
        id: session_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?,
        user_id: user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        question_id: question_id_from_str(&row.try_get::<String, _>("question_id").map_err(ser)?)?,
        mode: parse_mode(&mode_str)?,
        completed: row.try_get("completed").map_err(ser)?,
        elapsed_seconds: u32_from_i64("elapsed_seconds", elapsed)?,
        answer,
        sub_answers,
        correct: row.try_get("correct").map_err(ser)?,
        feedback,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
