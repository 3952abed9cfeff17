pub mod clear;
pub mod config;
pub mod import;
pub mod status;
pub mod sync;

use anyhow::{anyhow, Result};
use library_sync_config::{Config, PathManager};
use library_sync_core::{JsonLibraryStore, SyncEngine};
use library_sync_sources::{TraktClient, TraktMetadataClient};
use std::sync::Arc;

/// Wire the engine to its real collaborators. With `interactive_auth` the
/// client may walk the user through the OAuth flow; without it only a saved
/// token is picked up, so read-only commands never block on a prompt.
pub(crate) async fn build_engine(interactive_auth: bool) -> Result<SyncEngine> {
    let path_manager = PathManager::default();
    path_manager.ensure_directories()?;

    let config = Config::load(&path_manager.config_file())?;
    let tracker = config.tracker.as_ref().ok_or_else(|| {
        anyhow!("Tracking service not configured. Run 'watchvault config tracker' first.")
    })?;

    let mut client = TraktClient::new(tracker);
    if interactive_auth {
        client.authenticate().await?;
    } else {
        client.load_saved_token()?;
    }

    let metadata = TraktMetadataClient::new(&config.metadata, tracker.client_id.clone());
    let store = JsonLibraryStore::open(path_manager.library_file())?;

    Ok(SyncEngine::new(
        Arc::new(client),
        Arc::new(metadata),
        Arc::new(store),
        config.sync,
        config.auto_sync,
    ))
}
