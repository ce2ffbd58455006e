// src/models/performance.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::assessment::AssessmentKind;

/// One graded exam or list as seen by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactResult {
    pub id: String,
    pub kind: AssessmentKind,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub score_obtained: f64,
    pub score_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub label: String,
    pub score_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub kind: AssessmentKind,
    pub title: String,
    pub date: DateTime<Utc>,
    pub score_percent: f64,
}

/// Derived per request, never persisted.
///
/// `average`, `best` and `latest` keep full precision; display rounding is
/// left to the consumer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CourseAggregateStats {
    pub average: f64,
    pub best: f64,
    pub latest: f64,
    pub exams_series: Vec<SeriesPoint>,
    pub lists_series: Vec<SeriesPoint>,
    pub combined_series: Vec<SeriesPoint>,
    pub history: Vec<HistoryEntry>,
}

/// Dashboard payload, flattened into parallel label/score arrays.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub average: f64,
    pub best: f64,
    pub latest: f64,
    pub exams_labels: Vec<String>,
    pub exams_scores: Vec<f64>,
    pub lists_labels: Vec<String>,
    pub lists_scores: Vec<f64>,
    pub combined_labels: Vec<String>,
    pub combined_scores: Vec<f64>,
    pub history: Vec<HistoryEntry>,
}

fn unzip(series: Vec<SeriesPoint>) -> (Vec<String>, Vec<f64>) {
    series.into_iter().map(|p| (p.label, p.score_percent)).unzip()
}

impl From<CourseAggregateStats> for PerformanceResponse {
    fn from(stats: CourseAggregateStats) -> Self {
        let (exams_labels, exams_scores) = unzip(stats.exams_series);
        let (lists_labels, lists_scores) = unzip(stats.lists_series);
        let (combined_labels, combined_scores) = unzip(stats.combined_series);

        Self {
            average: stats.average,
            best: stats.best,
            latest: stats.latest,
            exams_labels,
            exams_scores,
            lists_labels,
            lists_scores,
            combined_labels,
            combined_scores,
            history: stats.history,
        }
    }
}
