// src/services/correction.rs

use std::collections::HashSet;
use std::fmt;

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answer::{AnswerWrite, GradedAnswer, WriteOrigin},
        assessment::Assessment,
        correction::{CorrectionItem, CorrectionReceipt, CorrectionRequest},
        question::Question,
    },
    services::grading::grade,
    store::{AnswerStore, Catalog},
};

pub const EXAM_NOT_FOUND: &str = "Exam not found.";

/// Behaviour switches for the correction flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionPolicy {
    /// Skip responses whose question is not in the exam snapshot instead of
    /// failing the batch.
    pub skip_unknown_questions: bool,
}

/// Lifecycle of one correction request, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStage {
    Received,
    Validated,
    Graded,
    Persisted,
    Acknowledged,
}

impl fmt::Display for CorrectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrectionStage::Received => "received",
            CorrectionStage::Validated => "validated",
            CorrectionStage::Graded => "graded",
            CorrectionStage::Persisted => "persisted",
            CorrectionStage::Acknowledged => "acknowledged",
        };
        f.write_str(name)
    }
}

/// Graded batch, ready to be written in one go.
#[derive(Debug, Default, PartialEq)]
pub struct CorrectionPlan {
    pub writes: Vec<AnswerWrite>,
    pub skipped: Vec<String>,
}

/// Grades a student's exam on behalf of an instructor.
///
/// The exam snapshot is the only answer key consulted. The whole batch is
/// graded and validated before anything is written, so a rejected item
/// leaves the student's answers untouched.
pub async fn submit_correction(
    catalog: &dyn Catalog,
    answers: &dyn AnswerStore,
    policy: CorrectionPolicy,
    instructor_id: &str,
    exam_id: &str,
    request: CorrectionRequest,
) -> Result<CorrectionReceipt, AppError> {
    log_stage(CorrectionStage::Received, exam_id, &request.student_id);

    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let exam = catalog
        .exam(exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(EXAM_NOT_FOUND.to_string()))?;

    // Another instructor's exam is indistinguishable from a missing one.
    let owns_course = catalog
        .course(&exam.course_id)
        .await?
        .is_some_and(|course| course.owner_id == instructor_id);
    if !owns_course {
        return Err(AppError::NotFound(EXAM_NOT_FOUND.to_string()));
    }
    log_stage(CorrectionStage::Validated, exam_id, &request.student_id);

    let plan = plan_correction(&exam, &request.responses, policy)?;
    log_stage(CorrectionStage::Graded, exam_id, &request.student_id);

    let saved = answers
        .upsert_many(&request.student_id, exam_id, plan.writes, WriteOrigin::Instructor)
        .await?;
    log_stage(CorrectionStage::Persisted, exam_id, &request.student_id);

    tracing::info!(
        exam_id = %exam_id,
        student_id = %request.student_id,
        saved = saved.len(),
        skipped = plan.skipped.len(),
        "Correction saved"
    );
    log_stage(CorrectionStage::Acknowledged, exam_id, &request.student_id);

    Ok(CorrectionReceipt {
        ok: true,
        saved: saved.len(),
        skipped: plan.skipped,
    })
}

/// Grades every response against the exam snapshot. Pure.
pub fn plan_correction(
    exam: &Assessment,
    responses: &[CorrectionItem],
    policy: CorrectionPolicy,
) -> Result<CorrectionPlan, AppError> {
    let mut plan = CorrectionPlan::default();
    let mut seen = HashSet::new();

    for item in responses {
        if !seen.insert(item.question_id.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Question '{}' appears more than once in the batch.",
                item.question_id
            )));
        }

        let Some(question) = exam.question(&item.question_id) else {
            if policy.skip_unknown_questions {
                tracing::warn!(
                    exam_id = %exam.id,
                    question_id = %item.question_id,
                    "Question not in exam snapshot, skipping"
                );
                plan.skipped.push(item.question_id.clone());
                continue;
            }
            return Err(AppError::Config(format!(
                "Question '{}' is not part of exam '{}'.",
                item.question_id, exam.id
            )));
        };

        plan.writes.push(AnswerWrite {
            question_id: item.question_id.clone(),
            graded: grade_item(question, item)?,
        });
    }

    Ok(plan)
}

fn grade_item(question: &Question, item: &CorrectionItem) -> Result<GradedAnswer, AppError> {
    if question.kind.is_auto_gradable() {
        if item.manual_score.is_some() {
            tracing::debug!(question_id = %question.id, "Ignoring client score for auto-graded question");
        }
        return Ok(grade(question, &item.response).into_graded(item.response.clone(), true));
    }

    let score = validate_manual_score(question, item.manual_score)?;
    Ok(GradedAnswer {
        raw_response: item.response.clone(),
        score_obtained: score,
        score_max: question.max_score,
        is_correct: score > 0.0,
        finalized: true,
    })
}

/// Instructor scores must lie in `[0, max_score]`. Fractions are kept as is.
fn validate_manual_score(question: &Question, score: Option<f64>) -> Result<f64, AppError> {
    let score = score.ok_or_else(|| {
        AppError::BadRequest(format!(
            "Question '{}' ({}) requires pontuacaoObtida.",
            question.id,
            question.kind.type_name()
        ))
    })?;

    if !score.is_finite() || score < 0.0 || score > question.max_score {
        return Err(AppError::BadRequest(format!(
            "Question '{}': pontuacaoObtida {} must be between 0 and {}.",
            question.id, score, question.max_score
        )));
    }

    Ok(score)
}

fn log_stage(stage: CorrectionStage, exam_id: &str, student_id: &str) {
    tracing::debug!(%stage, exam_id = %exam_id, student_id = %student_id, "correction");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::AssessmentKind;
    use chrono::Utc;
    use serde_json::{Value, json};

    fn exam() -> Assessment {
        let questions = vec![
            json!({"id": "alt", "type": "alternativa", "maxScore": 2.0, "alternatives": [
                {"letter": "A", "text": "x", "isCorrect": true},
                {"letter": "B", "text": "y", "isCorrect": false}
            ]}),
            json!({"id": "essay", "type": "dissertativa", "maxScore": 5.0}),
        ]
        .into_iter()
        .map(|v| Question::from_value(v).unwrap())
        .collect();

        Assessment {
            id: "exam-1".into(),
            course_id: "course-1".into(),
            kind: AssessmentKind::Exam,
            title: "Midterm".into(),
            questions,
            created_at: Utc::now(),
        }
    }

    fn item(question_id: &str, response: Value, manual_score: Option<f64>) -> CorrectionItem {
        CorrectionItem {
            question_id: question_id.into(),
            response,
            manual_score,
        }
    }

    #[test]
    fn auto_graded_types_ignore_client_score() {
        let plan = plan_correction(
            &exam(),
            &[item("alt", json!("B"), Some(2.0))],
            CorrectionPolicy::default(),
        )
        .unwrap();

        let graded = &plan.writes[0].graded;
        assert!(!graded.is_correct);
        assert_eq!(graded.score_obtained, 0.0);
        assert!(graded.finalized);
    }

    #[test]
    fn manual_score_is_preserved_exactly() {
        let plan = plan_correction(
            &exam(),
            &[item("essay", json!("Essay"), Some(1.25))],
            CorrectionPolicy::default(),
        )
        .unwrap();

        let graded = &plan.writes[0].graded;
        assert_eq!(graded.score_obtained, 1.25);
        assert_eq!(graded.score_max, 5.0);
        assert!(graded.is_correct);
    }

    #[test]
    fn manual_score_out_of_range_rejects_batch() {
        for score in [Some(-1.0), Some(5.5), Some(f64::NAN), None] {
            let err = plan_correction(
                &exam(),
                &[item("alt", json!("A"), None), item("essay", json!("Essay"), score)],
                CorrectionPolicy::default(),
            )
            .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "score {score:?}");
        }
    }

    #[test]
    fn boundary_scores_are_accepted() {
        for score in [0.0, 5.0] {
            let plan = plan_correction(
                &exam(),
                &[item("essay", json!(""), Some(score))],
                CorrectionPolicy::default(),
            )
            .unwrap();
            assert_eq!(plan.writes[0].graded.score_obtained, score);
        }
    }

    #[test]
    fn unknown_question_aborts_by_default() {
        let err = plan_correction(
            &exam(),
            &[item("alt", json!("A"), None), item("ghost", json!("A"), None)],
            CorrectionPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn unknown_question_can_be_skipped() {
        let plan = plan_correction(
            &exam(),
            &[item("ghost", json!("A"), None), item("alt", json!("A"), None)],
            CorrectionPolicy {
                skip_unknown_questions: true,
            },
        )
        .unwrap();
        assert_eq!(plan.skipped, vec!["ghost".to_string()]);
        assert_eq!(plan.writes.len(), 1);
        assert!(plan.writes[0].graded.is_correct);
    }

    #[test]
    fn duplicate_question_in_batch_is_rejected() {
        let err = plan_correction(
            &exam(),
            &[item("alt", json!("A"), None), item("alt", json!("B"), None)],
            CorrectionPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
