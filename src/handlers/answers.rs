// src/handlers/answers.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::answer::SubmitListAnswersRequest,
    services::submission,
    state::AppState,
    utils::jwt::Claims,
};

/// Saves the caller's answers to an exercise list.
pub async fn submit_list_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(list_id): Path<String>,
    Json(req): Json<SubmitListAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let saved = submission::submit_list_answers(
        state.catalog.as_ref(),
        state.answers.as_ref(),
        &claims.sub,
        &list_id,
        req,
    )
    .await?;

    Ok(Json(json!({
        "ok": true,
        "message": format!("{} answers saved", saved.len()),
        "respostas": saved,
    })))
}

/// Returns the caller's saved answers for an exercise list.
pub async fn get_list_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(list_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = submission::list_answers(
        state.catalog.as_ref(),
        state.answers.as_ref(),
        &claims.sub,
        &list_id,
    )
    .await?;

    Ok(Json(view))
}

pub async fn get_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(answer_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let answer = submission::get_answer(state.answers.as_ref(), &claims.sub, &answer_id).await?;
    Ok(Json(answer))
}
