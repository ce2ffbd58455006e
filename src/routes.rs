// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{answers, correction, health, performance},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (exams, lists, answers, courses).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores and configuration).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let exam_routes = Router::new()
        .route("/{exam_id}/corrections", post(correction::submit_exam_correction))
        // Auth first, then instructor check
        .layer(middleware::from_fn(instructor_middleware))
        .layer(auth.clone());

    let list_routes = Router::new()
        .route(
            "/{list_id}/answers",
            get(answers::get_list_answers).post(answers::submit_list_answers),
        )
        .layer(auth.clone());

    let answer_routes = Router::new()
        .route("/{answer_id}", get(answers::get_answer))
        .layer(auth.clone());

    let course_routes = Router::new()
        .route("/{course_id}/performance/me", get(performance::my_course_performance))
        .merge(
            Router::new()
                .route("/{course_id}/performance", get(performance::course_performance))
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(auth);

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/exams", exam_routes)
        .nest("/api/lists", list_routes)
        .nest("/api/answers", answer_routes)
        .nest("/api/courses", course_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
