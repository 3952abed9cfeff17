use library_sync_sources::SourceError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A start request arrived while a run was active. Runs are never
    /// queued; the caller retries once the current run finishes.
    #[error("an import is already running")]
    AlreadyRunning,

    #[error("not authenticated with the tracking service")]
    NotAuthenticated,

    /// A whole fetch failed. Used by the preview builder, which refuses to
    /// return partial results, and by the per-pass fetches of the sync
    /// engine.
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
