// src/handlers/correction.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::correction::CorrectionRequest,
    services::correction::submit_correction,
    state::AppState,
    utils::jwt::Claims,
};

/// Instructor grades a student's exam.
///
/// * Grades auto-gradable questions from the exam snapshot.
/// * Takes `pontuacaoObtida` for free-response questions.
/// * Writes every answer for `alunoId` or none of them.
pub async fn submit_exam_correction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
    Json(req): Json<CorrectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = submit_correction(
        state.catalog.as_ref(),
        state.answers.as_ref(),
        state.correction_policy(),
        &claims.sub,
        &exam_id,
        req,
    )
    .await?;

    Ok(Json(receipt))
}
