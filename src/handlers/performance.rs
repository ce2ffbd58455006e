// src/handlers/performance.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::performance::PerformanceResponse,
    services::performance::{Viewer, compute_course_stats},
    state::AppState,
    utils::jwt::Claims,
};

/// Course-wide performance across all students.
/// Instructor only, and only for courses they own.
pub async fn course_performance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stats = compute_course_stats(
        state.catalog.as_ref(),
        state.answers.as_ref(),
        Viewer::Instructor(&claims.sub),
        &course_id,
    )
    .await?;

    Ok(Json(PerformanceResponse::from(stats)))
}

/// The caller's own performance in a course.
pub async fn my_course_performance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stats = compute_course_stats(
        state.catalog.as_ref(),
        state.answers.as_ref(),
        Viewer::Student(&claims.sub),
        &course_id,
    )
    .await?;

    Ok(Json(PerformanceResponse::from(stats)))
}
