// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'answers' table in the database.
/// One row per (student, exam or list, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,

    /// The student the answer belongs to.
    pub owner_id: String,

    /// Exam or exercise-list id the question was answered within.
    pub context_id: String,

    pub question_id: String,

    /// Whatever the student submitted: a letter, a boolean vector, a number, free text.
    pub raw_response: Json<Value>,

    pub score_obtained: f64,
    pub score_max: f64,
    pub is_correct: bool,

    pub finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of grading one response, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub raw_response: Value,
    pub score_obtained: f64,
    pub score_max: f64,
    pub is_correct: bool,
    pub finalized: bool,
}

/// A graded answer addressed to one question, used for batch writes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerWrite {
    pub question_id: String,
    pub graded: GradedAnswer,
}

/// Who is writing. Students may not touch a finalized answer; instructors
/// re-grading an exam may.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    Student,
    Instructor,
}

impl WriteOrigin {
    pub fn may_overwrite_finalized(self) -> bool {
        matches!(self, WriteOrigin::Instructor)
    }
}

/// Per-student score totals of the finalized answers in one context.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct ContextTotal {
    pub context_id: String,
    pub owner_id: String,
    pub score_obtained: f64,
    pub score_max: f64,
}

/// DTO for a student saving answers to an exercise list.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitListAnswersRequest {
    #[serde(rename = "respostas")]
    #[validate(length(min = 1, max = 500, message = "respostas must not be empty."))]
    pub responses: Vec<ListAnswerItem>,

    /// Finalizes every answer in the batch.
    #[serde(rename = "finalizado", default)]
    pub finalize: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAnswerItem {
    #[serde(rename = "questaoId")]
    pub question_id: String,

    #[serde(rename = "resposta", default)]
    pub response: Value,
}

/// What a student sees when reopening an exercise list.
#[derive(Debug, Serialize)]
pub struct ListAnswersView {
    pub ok: bool,

    /// questaoId -> raw response.
    #[serde(rename = "respostas")]
    pub responses: std::collections::BTreeMap<String, Value>,

    #[serde(rename = "finalizado")]
    pub finalized: bool,

    #[serde(rename = "finalizadoEm")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl ListAnswersView {
    pub fn from_answers(answers: &[Answer]) -> Self {
        let mut responses = std::collections::BTreeMap::new();
        let mut finalized_at: Option<DateTime<Utc>> = None;
        let mut finalized = false;

        for answer in answers {
            responses.insert(answer.question_id.clone(), answer.raw_response.0.clone());
            if answer.finalized {
                finalized = true;
                finalized_at = match (finalized_at, answer.finalized_at) {
                    (Some(current), Some(at)) => Some(current.max(at)),
                    (current, at) => current.or(at),
                };
            }
        }

        Self {
            ok: true,
            responses,
            finalized,
            finalized_at,
        }
    }
}
