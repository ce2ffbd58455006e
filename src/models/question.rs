// src/models/question.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Propositions beyond this count would overflow the implicit `2^i` weights.
pub const MAX_PROPOSITIONS: usize = 32;

/// A question as frozen inside an exam or exercise-list snapshot.
///
/// Stored as JSON, e.g.
/// `{"id": "q1", "type": "numerica", "maxScore": 2.0, "correctValue": 4, "tolerance": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[validate(length(min = 1, max = 128))]
    pub id: String,

    /// Points awarded for a fully correct answer.
    #[validate(custom(function = validate_max_score))]
    pub max_score: f64,

    /// Type tag plus the type-specific answer key.
    #[serde(flatten)]
    #[validate(custom(function = validate_kind))]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum QuestionKind {
    /// Single choice: exactly one alternative is correct.
    Alternativa { alternatives: Vec<Alternative> },

    /// Independent true/false statements answered as a boolean vector.
    #[serde(alias = "vf")]
    Afirmacoes { statements: Vec<Statement> },

    /// Summation: the answer is the sum of the weights of the correct items.
    Proposicoes { propositions: Vec<Proposition> },

    Numerica { correct_value: f64, tolerance: f64 },

    /// Free text, scored by an instructor.
    Dissertativa {
        #[serde(default)]
        reference_answer: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub letter: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    #[serde(default)]
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposition {
    #[serde(default)]
    pub text: String,
    pub is_correct: bool,

    /// Explicit weight. Defaults to `2^position`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::Alternativa { .. } => "alternativa",
            QuestionKind::Afirmacoes { .. } => "afirmacoes",
            QuestionKind::Proposicoes { .. } => "proposicoes",
            QuestionKind::Numerica { .. } => "numerica",
            QuestionKind::Dissertativa { .. } => "dissertativa",
        }
    }

    /// Whether the answer key fully determines the score.
    pub fn is_auto_gradable(&self) -> bool {
        !matches!(self, QuestionKind::Dissertativa { .. })
    }
}

impl Proposition {
    pub fn weight(&self, position: usize) -> u64 {
        self.value
            .unwrap_or_else(|| 1u64.checked_shl(position as u32).unwrap_or(0))
    }
}

impl Question {
    /// Decodes and validates a single question definition.
    ///
    /// Unknown `type` tags and broken answer keys are configuration errors:
    /// the data was authored wrong, so nothing downstream may score it.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let question: Question = serde_json::from_value(value)
            .map_err(|e| AppError::Config(format!("Invalid question definition: {e}")))?;
        question.check()?;
        Ok(question)
    }

    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Config(format!("Invalid question '{}': {e}", self.id)))
    }
}

/// Decodes an embedded exam/list snapshot.
pub fn decode_snapshot(value: Value) -> Result<Vec<Question>, AppError> {
    let questions: Vec<Question> = serde_json::from_value(value)
        .map_err(|e| AppError::Config(format!("Invalid question snapshot: {e}")))?;
    for question in &questions {
        question.check()?;
    }
    Ok(questions)
}

fn validate_max_score(max_score: f64) -> Result<(), ValidationError> {
    if !max_score.is_finite() || max_score <= 0.0 {
        return Err(ValidationError::new("max_score_must_be_positive"));
    }
    Ok(())
}

fn validate_kind(kind: &QuestionKind) -> Result<(), ValidationError> {
    match kind {
        QuestionKind::Alternativa { alternatives } => {
            let correct = alternatives.iter().filter(|a| a.is_correct).count();
            if correct != 1 {
                return Err(ValidationError::new("exactly_one_correct_alternative"));
            }
        }
        QuestionKind::Afirmacoes { statements } => {
            if statements.is_empty() {
                return Err(ValidationError::new("statements_cannot_be_empty"));
            }
        }
        QuestionKind::Proposicoes { propositions } => {
            if propositions.is_empty() {
                return Err(ValidationError::new("propositions_cannot_be_empty"));
            }
            if propositions.len() > MAX_PROPOSITIONS {
                return Err(ValidationError::new("too_many_propositions"));
            }
        }
        QuestionKind::Numerica {
            correct_value,
            tolerance,
        } => {
            if !correct_value.is_finite() {
                return Err(ValidationError::new("correct_value_must_be_finite"));
            }
            if !tolerance.is_finite() || *tolerance < 0.0 {
                return Err(ValidationError::new("tolerance_must_be_non_negative"));
            }
        }
        QuestionKind::Dissertativa { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_numerica() {
        let q = Question::from_value(json!({
            "id": "q1",
            "type": "numerica",
            "maxScore": 2.0,
            "correctValue": 4,
            "tolerance": 0
        }))
        .unwrap();
        assert_eq!(q.kind.type_name(), "numerica");
        assert!(q.kind.is_auto_gradable());
    }

    #[test]
    fn vf_is_an_alias_for_afirmacoes() {
        let q = Question::from_value(json!({
            "id": "q2",
            "type": "vf",
            "maxScore": 1.0,
            "statements": [{"text": "Sky is blue", "isCorrect": true}]
        }))
        .unwrap();
        assert_eq!(q.kind.type_name(), "afirmacoes");
    }

    #[test]
    fn unknown_type_is_a_configuration_error() {
        let err = Question::from_value(json!({
            "id": "q3",
            "type": "matching",
            "maxScore": 1.0
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn alternativa_needs_exactly_one_correct_item() {
        let err = Question::from_value(json!({
            "id": "q4",
            "type": "alternativa",
            "maxScore": 1.0,
            "alternatives": [
                {"letter": "A", "text": "x", "isCorrect": true},
                {"letter": "B", "text": "y", "isCorrect": true}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rejects_negative_tolerance_and_zero_max_score() {
        assert!(Question::from_value(json!({
            "id": "q5", "type": "numerica", "maxScore": 1.0,
            "correctValue": 1, "tolerance": -0.5
        }))
        .is_err());
        assert!(Question::from_value(json!({
            "id": "q6", "type": "dissertativa", "maxScore": 0.0
        }))
        .is_err());
    }

    #[test]
    fn proposition_weights_default_to_powers_of_two() {
        let p = Proposition {
            text: String::new(),
            is_correct: true,
            value: None,
        };
        assert_eq!(p.weight(0), 1);
        assert_eq!(p.weight(3), 8);
        let explicit = Proposition { value: Some(16), ..p };
        assert_eq!(explicit.weight(0), 16);
    }
}
