use library_sync_models::ImportJobState;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::SyncError;

/// Owner of the single process-wide import job record. All outside access
/// goes through the start/snapshot/cancel operations; the running job
/// mutates the record through the crate-private methods. At most one run is
/// active at any time, enforced by `try_start`.
#[derive(Default)]
pub struct ImportJobController {
    state: Mutex<ImportJobState>,
    // Retained so a later version can await or propagate a crashed run;
    // pollers only ever read the state record.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ImportJobController {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ImportJobState> {
        // A poisoned lock only means a writer panicked mid-update; the state
        // record is still the best available answer for pollers
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the job slot. Fails when a run is active; otherwise resets the
    /// record for the new run. Never queues.
    pub fn try_start(&self) -> Result<(), SyncError> {
        let mut state = self.state();
        if state.in_progress {
            return Err(SyncError::AlreadyRunning);
        }
        *state = ImportJobState {
            in_progress: true,
            ..ImportJobState::default()
        };
        Ok(())
    }

    pub fn attach_handle(&self, handle: JoinHandle<()>) {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle);
    }

    /// Wait for the detached run to finish, if one was spawned.
    pub async fn join(&self) {
        let handle = {
            let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Snapshot copy of the current state; pollers never observe a record
    /// mid-mutation.
    pub fn snapshot(&self) -> ImportJobState {
        self.state().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state().in_progress
    }

    /// Cooperative cancellation: no new item starts once set, the item in
    /// flight completes. Idempotent; ignored when no run is active.
    pub fn request_cancel(&self) {
        let mut state = self.state();
        if state.in_progress && !state.cancellation_requested {
            state.cancellation_requested = true;
            info!("Import cancellation requested");
        }
    }

    pub fn cancel_requested(&self) -> bool {
        self.state().cancellation_requested
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.state().total = total;
    }

    pub(crate) fn set_current_item(&self, label: impl Into<String>) {
        self.state().current_item = Some(label.into());
    }

    pub(crate) fn record_error(&self, message: String) {
        self.state().errors.push(message);
    }

    pub(crate) fn item_finished(&self) {
        let mut state = self.state();
        if state.completed < state.total {
            state.completed += 1;
        }
    }

    /// Mark the run finished. Counters and errors stay readable as the
    /// final report until the next start resets them.
    pub(crate) fn finish(&self) {
        let mut state = self.state();
        state.in_progress = false;
        state.current_item = None;
    }
}
