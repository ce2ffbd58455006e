// src/store/postgres.rs

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, types::Json};

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerWrite, ContextTotal, GradedAnswer, WriteOrigin},
        assessment::{Assessment, AssessmentKind, AssessmentMeta, AssessmentMetaRow, AssessmentRow, Course},
    },
    store::{ANSWER_FINALIZED, AnswerStore, Catalog, QUESTION_NOT_FOUND},
};

/// Postgres error code for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Insert-or-update keyed by the unique `(owner_id, context_id, question_id)`
/// constraint. The `WHERE` on the conflict branch keeps finalized rows out of
/// reach of student writes: no row comes back in that case.
const UPSERT_ANSWER: &str = r#"
    INSERT INTO answers (
        id, owner_id, context_id, question_id, raw_response,
        score_obtained, score_max, is_correct,
        finalized, finalized_at, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
    ON CONFLICT (owner_id, context_id, question_id) DO UPDATE SET
        raw_response = EXCLUDED.raw_response,
        score_obtained = EXCLUDED.score_obtained,
        score_max = EXCLUDED.score_max,
        is_correct = EXCLUDED.is_correct,
        finalized = answers.finalized OR EXCLUDED.finalized,
        finalized_at = COALESCE(answers.finalized_at, EXCLUDED.finalized_at),
        updated_at = EXCLUDED.updated_at
    WHERE answers.finalized = FALSE OR $12
    RETURNING
        id, owner_id, context_id, question_id, raw_response,
        score_obtained, score_max, is_correct,
        finalized, finalized_at, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fails with `NotFound` unless every id is in the question catalog.
    async fn ensure_questions_exist(&self, question_ids: &[String]) -> Result<(), AppError> {
        let found: Vec<String> = sqlx::query_scalar("SELECT id FROM questions WHERE id = ANY($1)")
            .bind(question_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to look up questions: {:?}", e);
                AppError::from(e)
            })?;

        let found: HashSet<&str> = found.iter().map(String::as_str).collect();
        if let Some(missing) = question_ids.iter().find(|id| !found.contains(id.as_str())) {
            tracing::debug!(question_id = %missing, "write rejected, question not in catalog");
            return Err(AppError::NotFound(QUESTION_NOT_FOUND.to_string()));
        }
        Ok(())
    }
}

async fn write_answer<'e, E>(
    executor: E,
    owner_id: &str,
    context_id: &str,
    question_id: &str,
    graded: GradedAnswer,
    origin: WriteOrigin,
    now: DateTime<Utc>,
) -> Result<Answer, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let finalized_at = graded.finalized.then_some(now);

    sqlx::query_as::<_, Answer>(UPSERT_ANSWER)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(owner_id)
        .bind(context_id)
        .bind(question_id)
        .bind(Json(graded.raw_response))
        .bind(graded.score_obtained)
        .bind(graded.score_max)
        .bind(graded.is_correct)
        .bind(graded.finalized)
        .bind(finalized_at)
        .bind(now)
        .bind(origin.may_overwrite_finalized())
        .fetch_optional(executor)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| AppError::Conflict(ANSWER_FINALIZED.to_string()))
}

/// Course listing for `exams` or `exercise_lists`, with the snapshot's total
/// question value summed in SQL.
fn assessment_meta_query(table: &str) -> String {
    format!(
        r#"
        SELECT
            t.id,
            t.title,
            COALESCE(
                (SELECT SUM((q->>'maxScore')::DOUBLE PRECISION)
                 FROM jsonb_array_elements(t.questions) AS q),
                0
            )::DOUBLE PRECISION AS max_score,
            t.created_at
        FROM {table} t
        WHERE t.course_id = $1
        ORDER BY t.created_at, t.id
        "#
    )
}

fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return AppError::NotFound(QUESTION_NOT_FOUND.to_string());
        }
    }
    tracing::error!("Failed to upsert answer: {:?}", err);
    AppError::from(err)
}

#[async_trait]
impl AnswerStore for PgStore {
    async fn upsert(
        &self,
        owner_id: &str,
        context_id: &str,
        question_id: &str,
        graded: GradedAnswer,
        origin: WriteOrigin,
    ) -> Result<Answer, AppError> {
        if !self.question_exists(question_id).await? {
            tracing::debug!(question_id = %question_id, "write rejected, question not in catalog");
            return Err(AppError::NotFound(QUESTION_NOT_FOUND.to_string()));
        }

        write_answer(&self.pool, owner_id, context_id, question_id, graded, origin, Utc::now()).await
    }

    async fn upsert_many(
        &self,
        owner_id: &str,
        context_id: &str,
        writes: Vec<AnswerWrite>,
        origin: WriteOrigin,
    ) -> Result<Vec<Answer>, AppError> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }

        let question_ids: Vec<String> = writes.iter().map(|w| w.question_id.clone()).collect();
        self.ensure_questions_exist(&question_ids).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to open transaction: {:?}", e);
            AppError::from(e)
        })?;

        let mut saved = Vec::with_capacity(writes.len());
        for write in writes {
            // Dropping `tx` on error rolls every earlier write back.
            let answer = write_answer(
                &mut *tx,
                owner_id,
                context_id,
                &write.question_id,
                write.graded,
                origin,
                now,
            )
            .await?;
            saved.push(answer);
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit answers: {:?}", e);
            AppError::from(e)
        })?;

        Ok(saved)
    }

    async fn get_by_id(&self, owner_id: &str, answer_id: &str) -> Result<Option<Answer>, AppError> {
        sqlx::query_as::<_, Answer>(
            r#"
            SELECT
                id, owner_id, context_id, question_id, raw_response,
                score_obtained, score_max, is_correct,
                finalized, finalized_at, created_at, updated_at
            FROM answers
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(answer_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch answer: {:?}", e);
            AppError::from(e)
        })
    }

    async fn list_by_context(&self, owner_id: &str, context_id: &str) -> Result<Vec<Answer>, AppError> {
        sqlx::query_as::<_, Answer>(
            r#"
            SELECT
                id, owner_id, context_id, question_id, raw_response,
                score_obtained, score_max, is_correct,
                finalized, finalized_at, created_at, updated_at
            FROM answers
            WHERE owner_id = $1 AND context_id = $2
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(owner_id)
        .bind(context_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list answers: {:?}", e);
            AppError::from(e)
        })
    }

    async fn finalized_totals(
        &self,
        context_ids: &[String],
        owner_id: Option<&str>,
    ) -> Result<Vec<ContextTotal>, AppError> {
        if context_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ContextTotal>(
            r#"
            SELECT
                context_id,
                owner_id,
                SUM(score_obtained) AS score_obtained,
                SUM(score_max) AS score_max
            FROM answers
            WHERE finalized
              AND context_id = ANY($1)
              AND ($2::TEXT IS NULL OR owner_id = $2)
            GROUP BY context_id, owner_id
            ORDER BY context_id, owner_id
            "#,
        )
        .bind(context_ids)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to aggregate answers: {:?}", e);
            AppError::from(e)
        })
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn question_exists(&self, question_id: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1)")
            .bind(question_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check question: {:?}", e);
                AppError::from(e)
            })?;
        Ok(exists)
    }

    async fn course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        sqlx::query_as::<_, Course>("SELECT id, owner_id, title, created_at FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch course: {:?}", e);
                AppError::from(e)
            })
    }

    async fn exam(&self, exam_id: &str) -> Result<Option<Assessment>, AppError> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, course_id, title, questions, created_at FROM exams WHERE id = $1",
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam: {:?}", e);
            AppError::from(e)
        })?;

        row.map(|r| r.into_assessment(AssessmentKind::Exam)).transpose()
    }

    async fn exercise_list(&self, list_id: &str) -> Result<Option<Assessment>, AppError> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, course_id, title, questions, created_at FROM exercise_lists WHERE id = $1",
        )
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exercise list: {:?}", e);
            AppError::from(e)
        })?;

        row.map(|r| r.into_assessment(AssessmentKind::List)).transpose()
    }

    async fn course_assessments(&self, course_id: &str) -> Result<Vec<AssessmentMeta>, AppError> {
        let exams = sqlx::query_as::<_, AssessmentMetaRow>(&assessment_meta_query("exams"))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list course exams: {:?}", e);
            AppError::from(e)
        })?;

        let lists = sqlx::query_as::<_, AssessmentMetaRow>(&assessment_meta_query("exercise_lists"))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list course exercise lists: {:?}", e);
            AppError::from(e)
        })?;

        Ok(exams
            .into_iter()
            .map(|r| r.into_meta(AssessmentKind::Exam))
            .chain(lists.into_iter().map(|r| r.into_meta(AssessmentKind::List)))
            .collect())
    }
}
