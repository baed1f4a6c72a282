use std::{fmt, sync::Arc};

use layar_config::Config;
use layar_core::{MovieEnricher, MovieStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MovieStore>,
    /// `None` when no TMDB key is configured.
    pub enricher: Option<Arc<MovieEnricher>>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.backend())
            .field("enrichment", &self.enricher.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        store: Arc<dyn MovieStore>,
        enricher: Option<Arc<MovieEnricher>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            enricher,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
