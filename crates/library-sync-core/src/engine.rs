use library_sync_config::SyncTuning;
use library_sync_models::{ImportJobState, ImportOptions, SyncStatus};
use library_sync_sources::{MetadataClient, SourceClient};
use std::sync::Arc;
use tracing::info;

use crate::error::SyncError;
use crate::guard::ExistenceGuard;
use crate::job::ImportJobController;
use crate::store::LibraryStore;

/// Orchestrates the import/sync engine over its three collaborators. Cheap
/// to clone; the clone handed to a spawned import task shares the job
/// controller and the store with the original.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) source: Arc<dyn SourceClient>,
    pub(crate) metadata: Arc<dyn MetadataClient>,
    pub(crate) store: Arc<dyn LibraryStore>,
    pub(crate) guard: ExistenceGuard,
    pub(crate) jobs: Arc<ImportJobController>,
    pub(crate) tuning: SyncTuning,
    auto_sync: bool,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn SourceClient>,
        metadata: Arc<dyn MetadataClient>,
        store: Arc<dyn LibraryStore>,
        tuning: SyncTuning,
        auto_sync: bool,
    ) -> Self {
        Self {
            source,
            metadata,
            guard: ExistenceGuard::new(store.clone()),
            store,
            jobs: Arc::new(ImportJobController::new()),
            tuning,
            auto_sync,
        }
    }

    /// Kick off a full import on a detached task. Fails when a run is
    /// already active; the caller does not block on completion and follows
    /// progress via `import_status`.
    pub fn start_import(&self, options: ImportOptions) -> Result<(), SyncError> {
        self.jobs.try_start()?;
        info!(
            movies = options.import_movies,
            series = options.import_series,
            watchlist = options.import_watchlist,
            ratings = options.import_ratings,
            "Starting full import"
        );

        let engine = self.clone();
        let handle = tokio::spawn(async move {
            engine.run_full_import(options).await;
        });
        self.jobs.attach_handle(handle);
        Ok(())
    }

    pub fn import_status(&self) -> ImportJobState {
        self.jobs.snapshot()
    }

    pub fn cancel_import(&self) {
        self.jobs.request_cancel();
    }

    /// Wait for a previously started import to finish.
    pub async fn join_import(&self) {
        self.jobs.join().await;
    }

    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus {
            is_authenticated: self.source.is_authenticated(),
            last_sync_at: self.source.last_sync_time(),
            auto_sync_enabled: self.auto_sync,
        }
    }

    pub fn auto_sync_enabled(&self) -> bool {
        self.auto_sync
    }

    pub async fn library_stats(&self) -> Result<crate::store::LibraryStats, SyncError> {
        Ok(self.store.stats().await?)
    }
}
