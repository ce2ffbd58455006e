// src/services/submission.rs

use std::collections::HashSet;

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerWrite, ListAnswersView, SubmitListAnswersRequest, WriteOrigin},
        assessment::Assessment,
    },
    services::grading::grade,
    store::{AnswerStore, Catalog},
};

pub const LIST_NOT_FOUND: &str = "Exercise list not found.";
pub const ANSWER_NOT_FOUND: &str = "Answer not found.";

async fn load_list(catalog: &dyn Catalog, list_id: &str) -> Result<Assessment, AppError> {
    catalog
        .exercise_list(list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(LIST_NOT_FOUND.to_string()))
}

/// Saves a student's answers to an exercise list, graded server side.
///
/// Free-response questions are stored with a zero score until an
/// instructor corrects them. Once any answer in the batch is finalized the
/// request is rejected as a whole.
pub async fn submit_list_answers(
    catalog: &dyn Catalog,
    answers: &dyn AnswerStore,
    student_id: &str,
    list_id: &str,
    request: SubmitListAnswersRequest,
) -> Result<Vec<Answer>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let list = load_list(catalog, list_id).await?;

    let mut seen = HashSet::new();
    let mut writes = Vec::with_capacity(request.responses.len());
    for item in request.responses {
        if !seen.insert(item.question_id.clone()) {
            return Err(AppError::BadRequest(format!(
                "Question '{}' appears more than once in the batch.",
                item.question_id
            )));
        }

        let question = list.question(&item.question_id).ok_or_else(|| {
            AppError::Config(format!(
                "Question '{}' is not part of exercise list '{}'.",
                item.question_id, list.id
            ))
        })?;

        let graded = grade(question, &item.response).into_graded(item.response, request.finalize);
        writes.push(AnswerWrite {
            question_id: item.question_id,
            graded,
        });
    }

    let saved = answers
        .upsert_many(student_id, list_id, writes, WriteOrigin::Student)
        .await?;

    tracing::info!(
        list_id = %list_id,
        student_id = %student_id,
        saved = saved.len(),
        finalized = request.finalize,
        "List answers saved"
    );

    Ok(saved)
}

/// The caller's saved answers for an exercise list.
pub async fn list_answers(
    catalog: &dyn Catalog,
    answers: &dyn AnswerStore,
    student_id: &str,
    list_id: &str,
) -> Result<ListAnswersView, AppError> {
    let list = load_list(catalog, list_id).await?;
    let saved = answers.list_by_context(student_id, &list.id).await?;
    Ok(ListAnswersView::from_answers(&saved))
}

/// Ownership-scoped read; someone else's answer reads as missing.
pub async fn get_answer(
    answers: &dyn AnswerStore,
    owner_id: &str,
    answer_id: &str,
) -> Result<Answer, AppError> {
    answers
        .get_by_id(owner_id, answer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ANSWER_NOT_FOUND.to_string()))
}
