// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, store::ExamStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
