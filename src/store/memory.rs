// src/store/memory.rs

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, AnswerWrite, ContextTotal, GradedAnswer, WriteOrigin},
        assessment::{Assessment, AssessmentKind, AssessmentMeta, Course},
    },
    store::{ANSWER_FINALIZED, AnswerStore, Catalog, QUESTION_NOT_FOUND},
};

type AnswerKey = (String, String, String);

#[derive(Default)]
struct MemoryState {
    courses: HashMap<String, Course>,
    questions: HashSet<String>,
    exams: Vec<Assessment>,
    lists: Vec<Assessment>,
    answers: HashMap<AnswerKey, Answer>,
    writes: usize,
    unavailable: bool,
}

/// In-process store for tests and prototyping.
///
/// Each operation runs inside one critical section, which plays the role of
/// the database's conditional write.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        let state = self
            .state
            .lock()
            .map_err(|_| AppError::InternalServerError("memory store poisoned".to_string()))?;
        if state.unavailable {
            return Err(AppError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(state)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn seed_course(&self, course: Course) {
        self.state().courses.insert(course.id.clone(), course);
    }

    /// Registers a question id in the catalog without embedding it anywhere.
    pub fn seed_question(&self, question_id: impl Into<String>) {
        self.state().questions.insert(question_id.into());
    }

    /// Adds an exam or list; its snapshot questions join the catalog.
    pub fn seed_assessment(&self, assessment: Assessment) {
        let mut state = self.state();
        for question in &assessment.questions {
            state.questions.insert(question.id.clone());
        }
        match assessment.kind {
            AssessmentKind::Exam => state.exams.push(assessment),
            AssessmentKind::List => state.lists.push(assessment),
        }
    }

    /// Number of stored answer documents.
    pub fn answer_count(&self) -> usize {
        self.state().answers.len()
    }

    /// Number of answer writes that reached storage.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Simulates a connectivity outage: every operation fails as retryable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }
}

impl MemoryState {
    fn ensure_questions_exist<'a>(&self, mut ids: impl Iterator<Item = &'a str>) -> Result<(), AppError> {
        match ids.find(|id| !self.questions.contains(*id)) {
            Some(_) => Err(AppError::NotFound(QUESTION_NOT_FOUND.to_string())),
            None => Ok(()),
        }
    }

    /// Checks the finalize rule without writing.
    fn check_writable(&self, key: &AnswerKey, origin: WriteOrigin) -> Result<(), AppError> {
        match self.answers.get(key) {
            Some(existing) if existing.finalized && !origin.may_overwrite_finalized() => {
                Err(AppError::Conflict(ANSWER_FINALIZED.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn apply(&mut self, key: AnswerKey, graded: GradedAnswer, now: DateTime<Utc>) -> Answer {
        self.writes += 1;
        let (owner_id, context_id, question_id) = key.clone();

        let answer = match self.answers.remove(&key) {
            Some(existing) => Answer {
                raw_response: Json(graded.raw_response),
                score_obtained: graded.score_obtained,
                score_max: graded.score_max,
                is_correct: graded.is_correct,
                finalized: existing.finalized || graded.finalized,
                finalized_at: existing
                    .finalized_at
                    .or_else(|| graded.finalized.then_some(now)),
                updated_at: now,
                ..existing
            },
            None => Answer {
                id: uuid::Uuid::new_v4().to_string(),
                owner_id,
                context_id,
                question_id,
                raw_response: Json(graded.raw_response),
                score_obtained: graded.score_obtained,
                score_max: graded.score_max,
                is_correct: graded.is_correct,
                finalized: graded.finalized,
                finalized_at: graded.finalized.then_some(now),
                created_at: now,
                updated_at: now,
            },
        };

        self.answers.insert(key, answer.clone());
        answer
    }

    fn assessment(&self, kind: AssessmentKind, id: &str) -> Option<Assessment> {
        let pool = match kind {
            AssessmentKind::Exam => &self.exams,
            AssessmentKind::List => &self.lists,
        };
        pool.iter().find(|a| a.id == id).cloned()
    }
}

fn key(owner_id: &str, context_id: &str, question_id: &str) -> AnswerKey {
    (owner_id.to_string(), context_id.to_string(), question_id.to_string())
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn upsert(
        &self,
        owner_id: &str,
        context_id: &str,
        question_id: &str,
        graded: GradedAnswer,
        origin: WriteOrigin,
    ) -> Result<Answer, AppError> {
        let mut state = self.lock()?;
        state.ensure_questions_exist(std::iter::once(question_id))?;

        let key = key(owner_id, context_id, question_id);
        state.check_writable(&key, origin)?;
        Ok(state.apply(key, graded, Utc::now()))
    }

    async fn upsert_many(
        &self,
        owner_id: &str,
        context_id: &str,
        writes: Vec<AnswerWrite>,
        origin: WriteOrigin,
    ) -> Result<Vec<Answer>, AppError> {
        let mut state = self.lock()?;
        state.ensure_questions_exist(writes.iter().map(|w| w.question_id.as_str()))?;

        for write in &writes {
            state.check_writable(&key(owner_id, context_id, &write.question_id), origin)?;
        }

        let now = Utc::now();
        Ok(writes
            .into_iter()
            .map(|w| state.apply(key(owner_id, context_id, &w.question_id), w.graded, now))
            .collect())
    }

    async fn get_by_id(&self, owner_id: &str, answer_id: &str) -> Result<Option<Answer>, AppError> {
        let state = self.lock()?;
        Ok(state
            .answers
            .values()
            .find(|a| a.id == answer_id && a.owner_id == owner_id)
            .cloned())
    }

    async fn list_by_context(&self, owner_id: &str, context_id: &str) -> Result<Vec<Answer>, AppError> {
        let state = self.lock()?;
        let mut answers: Vec<Answer> = state
            .answers
            .values()
            .filter(|a| a.owner_id == owner_id && a.context_id == context_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(answers)
    }

    async fn finalized_totals(
        &self,
        context_ids: &[String],
        owner_id: Option<&str>,
    ) -> Result<Vec<ContextTotal>, AppError> {
        let state = self.lock()?;
        let mut totals: HashMap<(String, String), ContextTotal> = HashMap::new();

        for answer in state.answers.values() {
            if !answer.finalized || !context_ids.contains(&answer.context_id) {
                continue;
            }
            if owner_id.is_some_and(|owner| owner != answer.owner_id) {
                continue;
            }

            let entry = totals
                .entry((answer.context_id.clone(), answer.owner_id.clone()))
                .or_insert_with(|| ContextTotal {
                    context_id: answer.context_id.clone(),
                    owner_id: answer.owner_id.clone(),
                    score_obtained: 0.0,
                    score_max: 0.0,
                });
            entry.score_obtained += answer.score_obtained;
            entry.score_max += answer.score_max;
        }

        let mut totals: Vec<ContextTotal> = totals.into_values().collect();
        totals.sort_by(|a, b| {
            a.context_id
                .cmp(&b.context_id)
                .then_with(|| a.owner_id.cmp(&b.owner_id))
        });
        Ok(totals)
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn question_exists(&self, question_id: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.questions.contains(question_id))
    }

    async fn course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        Ok(self.lock()?.courses.get(course_id).cloned())
    }

    async fn exam(&self, exam_id: &str) -> Result<Option<Assessment>, AppError> {
        Ok(self.lock()?.assessment(AssessmentKind::Exam, exam_id))
    }

    async fn exercise_list(&self, list_id: &str) -> Result<Option<Assessment>, AppError> {
        Ok(self.lock()?.assessment(AssessmentKind::List, list_id))
    }

    async fn course_assessments(&self, course_id: &str) -> Result<Vec<AssessmentMeta>, AppError> {
        let state = self.lock()?;
        let of_course = |pool: &[Assessment]| {
            let mut metas: Vec<AssessmentMeta> = pool
                .iter()
                .filter(|a| a.course_id == course_id)
                .map(Assessment::meta)
                .collect();
            metas.sort_by_key(|m| m.created_at);
            metas
        };

        let mut metas = of_course(&state.exams);
        metas.extend(of_course(&state.lists));
        Ok(metas)
    }
}
