use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::correction::CorrectionPolicy,
    store::{AnswerStore, Catalog},
};

#[derive(Clone)]
pub struct AppState {
    pub answers: Arc<dyn AnswerStore>,
    pub catalog: Arc<dyn Catalog>,
    pub config: Config,
}

impl AppState {
    /// Uses one backend for both the answer store and the catalog.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: AnswerStore + Catalog + 'static,
    {
        Self {
            answers: store.clone(),
            catalog: store,
            config,
        }
    }

    pub fn correction_policy(&self) -> CorrectionPolicy {
        CorrectionPolicy {
            skip_unknown_questions: self.config.skip_unknown_questions,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
