// src/services/performance.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        answer::ContextTotal,
        assessment::{AssessmentKind, AssessmentMeta},
        performance::{ArtifactResult, CourseAggregateStats, HistoryEntry, SeriesPoint},
    },
    store::{AnswerStore, Catalog},
};

pub const COURSE_NOT_FOUND: &str = "Course not found.";

/// Whose results are being summarized.
#[derive(Debug, Clone, Copy)]
pub enum Viewer<'a> {
    /// A student looking at their own results.
    Student(&'a str),
    /// The course owner looking at every student's results.
    Instructor(&'a str),
}

/// Builds the dashboard statistics for one course.
///
/// Only finalized answers count. Missing or zero-valued data is left out
/// rather than treated as an error.
pub async fn compute_course_stats(
    catalog: &dyn Catalog,
    answers: &dyn AnswerStore,
    viewer: Viewer<'_>,
    course_id: &str,
) -> Result<CourseAggregateStats, AppError> {
    let course = catalog
        .course(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound(COURSE_NOT_FOUND.to_string()))?;

    let owner_filter = match viewer {
        Viewer::Student(student_id) => Some(student_id),
        Viewer::Instructor(instructor_id) => {
            if course.owner_id != instructor_id {
                return Err(AppError::NotFound(COURSE_NOT_FOUND.to_string()));
            }
            None
        }
    };

    let metas = catalog.course_assessments(course_id).await?;
    let context_ids: Vec<String> = metas.iter().map(|m| m.id.clone()).collect();
    let totals = answers.finalized_totals(&context_ids, owner_filter).await?;

    let stats = aggregate(collect_results(&metas, &totals));
    tracing::debug!(
        course_id = %course_id,
        artifacts = stats.combined_series.len(),
        "Computed course performance"
    );
    Ok(stats)
}

/// Joins assessment metadata with per-student totals.
///
/// Each artifact is scored against its full value, so unanswered questions
/// count as zero. With one student the raw obtained score is kept; with
/// several, the artifact scores as the mean of the students' percentages.
/// Artifacts with no value or no finalized answers are dropped.
pub fn collect_results(metas: &[AssessmentMeta], totals: &[ContextTotal]) -> Vec<ArtifactResult> {
    let mut by_context: HashMap<&str, Vec<&ContextTotal>> = HashMap::new();
    for total in totals {
        by_context.entry(total.context_id.as_str()).or_default().push(total);
    }

    metas
        .iter()
        .filter_map(|meta| {
            if !meta.max_score.is_finite() || meta.max_score <= 0.0 {
                return None;
            }
            let usable: Vec<&ContextTotal> = by_context
                .get(meta.id.as_str())?
                .iter()
                .copied()
                .filter(|t| t.score_obtained.is_finite())
                .collect();

            let (score_obtained, score_max) = match usable.as_slice() {
                [] => return None,
                [single] => (single.score_obtained, meta.max_score),
                many => {
                    let sum: f64 = many
                        .iter()
                        .filter_map(|t| ratio(t.score_obtained, meta.max_score))
                        .sum();
                    (sum / many.len() as f64 * 100.0, 100.0)
                }
            };

            Some(ArtifactResult {
                id: meta.id.clone(),
                kind: meta.kind,
                title: meta.title.clone(),
                occurred_at: meta.created_at,
                score_obtained,
                score_max,
            })
        })
        .collect()
}

/// Orders artifacts chronologically and derives the summary numbers.
///
/// Ties on time keep exams ahead of lists and otherwise preserve input order.
pub fn aggregate(results: Vec<ArtifactResult>) -> CourseAggregateStats {
    let mut points: Vec<(ArtifactResult, f64)> = results
        .into_iter()
        .filter_map(|r| score_percent(r.score_obtained, r.score_max).map(|p| (r, p)))
        .collect();

    points.sort_by_key(|(r, _)| kind_rank(r.kind));
    points.sort_by_key(|(r, _)| r.occurred_at);

    let mut stats = CourseAggregateStats::default();
    if points.is_empty() {
        return stats;
    }

    let percents: Vec<f64> = points.iter().map(|(_, p)| *p).collect();
    stats.average = percents.iter().sum::<f64>() / percents.len() as f64;
    stats.best = percents.iter().copied().fold(f64::MIN, f64::max);
    stats.latest = percents.last().copied().unwrap_or_default();

    for (result, percent) in points {
        let point = SeriesPoint {
            label: result.title.clone(),
            score_percent: percent,
        };
        match result.kind {
            AssessmentKind::Exam => stats.exams_series.push(point),
            AssessmentKind::List => stats.lists_series.push(point),
        }

        stats.combined_series.push(SeriesPoint {
            label: format!("{} - {}", result.kind.label(), result.title),
            score_percent: percent,
        });
        stats.history.push(HistoryEntry {
            id: result.id,
            kind: result.kind,
            title: result.title,
            date: result.occurred_at,
            score_percent: percent,
        });
    }

    stats
}

/// `obtained / max * 100` rounded to one decimal; `None` when undefined.
pub fn score_percent(score_obtained: f64, score_max: f64) -> Option<f64> {
    ratio(score_obtained, score_max).map(|r| (r * 1000.0).round() / 10.0)
}

fn ratio(score_obtained: f64, score_max: f64) -> Option<f64> {
    if !score_obtained.is_finite() || !score_max.is_finite() || score_max <= 0.0 {
        return None;
    }
    Some(score_obtained / score_max)
}

fn kind_rank(kind: AssessmentKind) -> u8 {
    match kind {
        AssessmentKind::Exam => 0,
        AssessmentKind::List => 1,
    }
}
