// src/services/grading.rs

use serde_json::{Number, Value};

use crate::models::{
    answer::GradedAnswer,
    question::{Alternative, Proposition, Question, QuestionKind, Statement},
};

/// Score triple produced by grading one response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    pub score_obtained: f64,
    pub score_max: f64,
    pub is_correct: bool,
}

impl GradeOutcome {
    fn all_or_nothing(is_correct: bool, score_max: f64) -> Self {
        Self {
            score_obtained: if is_correct { score_max } else { 0.0 },
            score_max,
            is_correct,
        }
    }

    pub fn into_graded(self, raw_response: Value, finalized: bool) -> GradedAnswer {
        GradedAnswer {
            raw_response,
            score_obtained: self.score_obtained,
            score_max: self.score_max,
            is_correct: self.is_correct,
            finalized,
        }
    }
}

/// Grades a raw response against the question's answer key.
///
/// Pure and deterministic. Every auto-graded type is all-or-nothing.
/// Free-response questions come back as `0 / max, incorrect` and must be
/// scored by an instructor before they mean anything.
pub fn grade(question: &Question, response: &Value) -> GradeOutcome {
    let score_max = question.max_score;

    if response.is_null() {
        return GradeOutcome::all_or_nothing(false, score_max);
    }

    let is_correct = match &question.kind {
        QuestionKind::Alternativa { alternatives } => grade_alternativa(alternatives, response),
        QuestionKind::Afirmacoes { statements } => grade_afirmacoes(statements, response),
        QuestionKind::Proposicoes { propositions } => grade_proposicoes(propositions, response),
        QuestionKind::Numerica {
            correct_value,
            tolerance,
        } => grade_numerica(*correct_value, *tolerance, response),
        QuestionKind::Dissertativa { .. } => false,
    };

    GradeOutcome::all_or_nothing(is_correct, score_max)
}

/// Sum of the weights of every correct proposition.
pub fn proposition_target(propositions: &[Proposition]) -> u64 {
    propositions
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_correct)
        .map(|(i, p)| p.weight(i))
        .fold(0u64, u64::saturating_add)
}

fn grade_alternativa(alternatives: &[Alternative], response: &Value) -> bool {
    let Some(correct) = alternatives.iter().find(|a| a.is_correct) else {
        tracing::warn!("alternativa question without a correct alternative");
        return false;
    };

    let submitted = match response {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        _ => return false,
    };

    if submitted.is_empty() {
        return false;
    }

    submitted == correct.letter.trim() || (!correct.text.is_empty() && submitted == correct.text.trim())
}

/// Renders a number the way it would be typed: `1.0` becomes `"1"`.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn grade_afirmacoes(statements: &[Statement], response: &Value) -> bool {
    let Value::Array(items) = response else {
        return false;
    };

    if items.len() != statements.len() {
        return false;
    }

    items
        .iter()
        .zip(statements)
        .all(|(item, statement)| as_bool(item) == Some(statement.is_correct))
}

fn grade_proposicoes(propositions: &[Proposition], response: &Value) -> bool {
    let Some(submitted) = as_number(response) else {
        return false;
    };
    submitted == proposition_target(propositions) as f64
}

fn grade_numerica(correct_value: f64, tolerance: f64, response: &Value) -> bool {
    match as_number(response) {
        Some(submitted) => (submitted - correct_value).abs() <= tolerance,
        None => false,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings. Non-finite values are rejected.
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
