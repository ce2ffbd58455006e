// src/models/assessment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};

use crate::{
    error::AppError,
    models::question::{Question, decode_snapshot},
};

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    /// Instructor who owns the course.
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Graded artifact kinds within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentKind {
    #[serde(rename = "Prova")]
    Exam,
    #[serde(rename = "Lista")]
    List,
}

impl AssessmentKind {
    pub fn label(self) -> &'static str {
        match self {
            AssessmentKind::Exam => "Prova",
            AssessmentKind::List => "Lista",
        }
    }
}

/// An exam or exercise list together with its frozen question snapshot.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: String,
    pub course_id: String,
    pub kind: AssessmentKind,
    pub title: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Sum of the snapshot's question values.
    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.max_score).sum()
    }

    pub fn meta(&self) -> AssessmentMeta {
        AssessmentMeta {
            id: self.id.clone(),
            kind: self.kind,
            title: self.title.clone(),
            max_score: self.max_score(),
            created_at: self.created_at,
        }
    }
}

/// Lightweight listing entry used by the performance read side.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentMeta {
    pub id: String,
    pub kind: AssessmentKind,
    pub title: String,
    /// Full value of the artifact, answered or not.
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Raw row of 'exams' / 'exercise_lists'; the snapshot is decoded on load.
#[derive(Debug, FromRow)]
pub struct AssessmentRow {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub questions: Json<Value>,
    pub created_at: DateTime<Utc>,
}

impl AssessmentRow {
    pub fn into_assessment(self, kind: AssessmentKind) -> Result<Assessment, AppError> {
        let questions = decode_snapshot(self.questions.0)?;
        Ok(Assessment {
            id: self.id,
            course_id: self.course_id,
            kind,
            title: self.title,
            questions,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AssessmentMetaRow {
    pub id: String,
    pub title: String,
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
}

impl AssessmentMetaRow {
    pub fn into_meta(self, kind: AssessmentKind) -> AssessmentMeta {
        AssessmentMeta {
            id: self.id,
            kind,
            title: self.title,
            max_score: self.max_score,
            created_at: self.created_at,
        }
    }
}
