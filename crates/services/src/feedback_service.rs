use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use prep_core::model::{Answer, Feedback, Question};

use crate::error::FeedbackError;

#[derive(Clone, Debug)]
pub struct FeedbackConfig {
    pub base_url: String,
    pub api_key: String,
}

impl FeedbackConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PREP_EVAL_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("PREP_EVAL_BASE_URL")
            .unwrap_or_else(|_| "https://api.prep.example.com".into());
        Some(Self { base_url, api_key })
    }
}

/// Client for the hosted answer-evaluation endpoint.
///
/// Unconfigured environments get a disabled service; callers check
/// `enabled` and skip evaluation rather than treating it as an error.
#[derive(Clone)]
pub struct FeedbackService {
    client: Client,
    config: Option<FeedbackConfig>,
}

impl FeedbackService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(FeedbackConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<FeedbackConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Evaluate an answer against its question.
    ///
    /// The returned score is the evaluator's 1-10 rubric score; callers
    /// scale it before recording mastery.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` when the service is disabled, the request
    /// fails, or the response is malformed.
    pub async fn evaluate(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> Result<Feedback, FeedbackError> {
        let config = self.config.as_ref().ok_or(FeedbackError::Disabled)?;

        let url = format!("{}/evaluate", config.base_url.trim_end_matches('/'));
        let payload = EvaluateRequest {
            question: &question.text,
            category: question.category.as_str(),
            expert_answer: question.expert_answer.as_deref(),
            answer: answer.as_text(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedbackError::HttpStatus(response.status()));
        }

        let body: EvaluateResponse = response.json().await?;
        let Some(evaluation) = body.evaluation else {
            return Err(FeedbackError::EmptyResponse);
        };
        if !(1..=10).contains(&evaluation.score) {
            return Err(FeedbackError::InvalidScore(evaluation.score));
        }

        Ok(Feedback {
            score: evaluation.score,
            strengths: evaluation.strengths,
            improvements: evaluation.improvements,
        })
    }
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    question: &'a str,
    category: &'a str,
    expert_answer: Option<&'a str>,
    answer: String,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    evaluation: Option<Evaluation>,
}

#[derive(Debug, Deserialize)]
struct Evaluation {
    score: u8,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}
