// src/models/correction.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// DTO for an instructor correcting a student's exam.
///
/// Field names follow the routing layer's payload:
/// `{ "alunoId": "...", "respostas": [{ "questaoId": "...", "resposta": ..., "pontuacaoObtida": 1.25 }] }`.
#[derive(Debug, Deserialize, Validate)]
pub struct CorrectionRequest {
    #[serde(rename = "alunoId")]
    #[validate(length(min = 1, max = 128, message = "alunoId is required."))]
    pub student_id: String,

    #[serde(rename = "respostas")]
    #[validate(length(min = 1, max = 500, message = "respostas must not be empty."))]
    pub responses: Vec<CorrectionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionItem {
    #[serde(rename = "questaoId")]
    pub question_id: String,

    #[serde(rename = "resposta", default)]
    pub response: Value,

    /// Instructor-assigned score. Required for free-response questions,
    /// ignored for auto-graded ones.
    #[serde(rename = "pontuacaoObtida", default)]
    pub manual_score: Option<f64>,
}

/// Acknowledgement returned once every graded item is persisted.
#[derive(Debug, Serialize)]
pub struct CorrectionReceipt {
    pub ok: bool,

    /// Number of answers written for the student.
    #[serde(rename = "salvas")]
    pub saved: usize,

    /// Question ids skipped because they are not part of the exam snapshot.
    #[serde(rename = "ignoradas", skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}
