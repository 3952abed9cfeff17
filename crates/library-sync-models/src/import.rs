use serde::{Deserialize, Serialize};

/// Which categories a full import should touch. Immutable for the lifetime
/// of one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportOptions {
    pub import_movies: bool,
    pub import_series: bool,
    pub import_watchlist: bool,
    pub import_ratings: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_movies: true,
            import_series: true,
            import_watchlist: true,
            import_ratings: true,
        }
    }
}

/// Live state of the (single) import job. Reset at the start of every run,
/// mutated in place by the running job, read as snapshot copies by pollers.
/// Never persisted across process restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportJobState {
    pub in_progress: bool,
    pub current_item: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub errors: Vec<String>,
    pub cancellation_requested: bool,
}

impl ImportJobState {
    pub fn is_finished(&self) -> bool {
        !self.in_progress
    }
}
