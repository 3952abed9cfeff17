use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate outcome of one incremental sync. Per-item failures are
/// collected here rather than raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub new_movie_watches: usize,
    pub new_episode_watches: usize,
    pub updated_watchlist_items: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.new_movie_watches == 0
            && self.new_episode_watches == 0
            && self.updated_watchlist_items == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_authenticated: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub auto_sync_enabled: bool,
}
