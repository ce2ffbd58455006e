// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use gradebook::{
    config::Config,
    models::{
        assessment::{Assessment, AssessmentKind, Course},
        question::Question,
    },
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::{ROLE_INSTRUCTOR, ROLE_STUDENT, sign_jwt},
};
use serde_json::{Value, json};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const INSTRUCTOR: &str = "prof-1";
pub const OTHER_INSTRUCTOR: &str = "prof-2";
pub const STUDENT_A: &str = "aluno-a";
pub const STUDENT_B: &str = "aluno-b";
pub const COURSE: &str = "course-1";
pub const EXAM: &str = "exam-1";
pub const LIST: &str = "list-1";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        skip_unknown_questions: false,
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn question(definition: Value) -> Question {
    Question::from_value(definition).expect("valid question")
}

pub fn exam_questions() -> Vec<Question> {
    vec![
        question(json!({
            "id": "q-alt", "type": "alternativa", "maxScore": 2.0,
            "alternatives": [
                {"letter": "A", "text": "Mercury", "isCorrect": false},
                {"letter": "B", "text": "Venus", "isCorrect": true},
                {"letter": "C", "text": "Mars", "isCorrect": false}
            ]
        })),
        question(json!({
            "id": "q-essay", "type": "dissertativa", "maxScore": 5.0,
            "referenceAnswer": "Greenhouse effect"
        })),
        question(json!({
            "id": "q-num", "type": "numerica", "maxScore": 1.0,
            "correctValue": 4, "tolerance": 0
        })),
        question(json!({
            "id": "q-prop", "type": "proposicoes", "maxScore": 2.0,
            "propositions": [
                {"text": "p0", "isCorrect": true},
                {"text": "p1", "isCorrect": false},
                {"text": "p2", "isCorrect": false},
                {"text": "p3", "isCorrect": true}
            ]
        })),
    ]
}

pub fn list_questions() -> Vec<Question> {
    vec![
        question(json!({
            "id": "l-vf", "type": "afirmacoes", "maxScore": 4.0,
            "statements": [
                {"text": "Water boils at 100C at sea level", "isCorrect": true},
                {"text": "The moon is a planet", "isCorrect": false}
            ]
        })),
        question(json!({
            "id": "l-num", "type": "numerica", "maxScore": 6.0,
            "correctValue": 9.8, "tolerance": 0.1
        })),
    ]
}

/// A course with one exam and, ten minutes later, one exercise list.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.seed_course(Course {
        id: COURSE.to_string(),
        owner_id: INSTRUCTOR.to_string(),
        title: "Physics I".to_string(),
        created_at: base_time(),
    });
    store.seed_assessment(Assessment {
        id: EXAM.to_string(),
        course_id: COURSE.to_string(),
        kind: AssessmentKind::Exam,
        title: "Midterm".to_string(),
        questions: exam_questions(),
        created_at: base_time(),
    });
    store.seed_assessment(Assessment {
        id: LIST.to_string(),
        course_id: COURSE.to_string(),
        kind: AssessmentKind::List,
        title: "Kinematics".to_string(),
        questions: list_questions(),
        created_at: base_time() + Duration::minutes(10),
    });
    store
}

pub fn token(user_id: &str, role: &str) -> String {
    sign_jwt(user_id, role, JWT_SECRET, 600).expect("sign token")
}

pub fn instructor_token() -> String {
    token(INSTRUCTOR, ROLE_INSTRUCTOR)
}

pub fn student_token(student_id: &str) -> String {
    token(student_id, ROLE_STUDENT)
}

/// Spawns the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(store: Arc<MemoryStore>, config: Config) -> String {
    let state = AppState::new(store, config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}
