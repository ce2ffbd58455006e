// src/store/mod.rs

//! Storage seams. Services and handlers only see these traits; `PgStore`
//! backs production and `MemoryStore` backs tests and local prototyping.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerWrite, ContextTotal, GradedAnswer, WriteOrigin},
        assessment::{Assessment, AssessmentMeta, Course},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const QUESTION_NOT_FOUND: &str = "The referenced question was not found.";
pub const ANSWER_FINALIZED: &str = "The answer has been finalized and can no longer be modified.";

/// Graded answers, keyed by `(owner_id, context_id, question_id)`.
///
/// `owner_id` is always an explicit parameter: reads never cross owners and
/// a non-owner cannot tell a foreign answer from a missing one.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Create-or-update in a single conditional write.
    ///
    /// * The question must exist in the catalog, otherwise `NotFound` and no write.
    /// * `created_at` is kept on update, `updated_at` moves forward.
    /// * `finalized_at` is stamped on the first finalization only.
    /// * A `Student` write to a finalized answer fails with `Conflict`.
    async fn upsert(
        &self,
        owner_id: &str,
        context_id: &str,
        question_id: &str,
        graded: GradedAnswer,
        origin: WriteOrigin,
    ) -> Result<Answer, AppError>;

    /// Same rules as `upsert`, applied to every item; all or nothing.
    async fn upsert_many(
        &self,
        owner_id: &str,
        context_id: &str,
        writes: Vec<AnswerWrite>,
        origin: WriteOrigin,
    ) -> Result<Vec<Answer>, AppError>;

    async fn get_by_id(&self, owner_id: &str, answer_id: &str) -> Result<Option<Answer>, AppError>;

    /// Newest first.
    async fn list_by_context(&self, owner_id: &str, context_id: &str) -> Result<Vec<Answer>, AppError>;

    /// Sums of finalized answers per `(context, owner)`, optionally for one owner.
    async fn finalized_totals(
        &self,
        context_ids: &[String],
        owner_id: Option<&str>,
    ) -> Result<Vec<ContextTotal>, AppError>;
}

/// Read-only view of course content owned by the authoring layer.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn question_exists(&self, question_id: &str) -> Result<bool, AppError>;

    async fn course(&self, course_id: &str) -> Result<Option<Course>, AppError>;

    async fn exam(&self, exam_id: &str) -> Result<Option<Assessment>, AppError>;

    async fn exercise_list(&self, list_id: &str) -> Result<Option<Assessment>, AppError>;

    /// Exams then lists of a course, each ordered by creation time.
    async fn course_assessments(&self, course_id: &str) -> Result<Vec<AssessmentMeta>, AppError>;
}
