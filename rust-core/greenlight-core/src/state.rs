//! # Application State
//!
//! Shared handles injected into every handler at startup.

use crate::config::Config;
use crate::store::MovieStore;
use std::sync::Arc;

/// State shared by all handlers
///
/// Cloning is cheap; every clone points at the same config and store.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Movie persistence
    pub movies: Arc<dyn MovieStore>,
}

impl AppState {
    /// Create state from a config and a store
    pub fn new(config: Config, movies: impl MovieStore + 'static) -> Self {
        Self {
            config: Arc::new(config),
            movies: Arc::new(movies),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NoopMovieStore;

    #[test]
    fn test_clones_share_handles() {
        let state = AppState::new(Config::default(), NoopMovieStore);
        let clone = state.clone();

        assert!(Arc::ptr_eq(&state.config, &clone.config));
        assert!(Arc::ptr_eq(&state.movies, &clone.movies));
    }
}
