use std::sync::Arc;

use crate::{metrics::Metrics, repository::TodoRepository, validation::PaginationParsing};

/// Behaviour switches that are read once from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiSettings {
    pub pagination: PaginationParsing,
    pub decrement_gauge_on_delete: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn TodoRepository>,
    pub metrics: Arc<Metrics>,
    pub settings: ApiSettings,
}

impl AppState {
    pub fn new(repo: Arc<dyn TodoRepository>, metrics: Arc<Metrics>) -> Self {
        Self {
            repo,
            metrics,
            settings: ApiSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ApiSettings) -> Self {
        self.settings = settings;
        self
    }
}
