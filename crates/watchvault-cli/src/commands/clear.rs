use color_eyre::Result;
use library_sync_config::{CredentialStore, PathManager};

use crate::output::Output;

pub fn run_clear(credentials: bool, timestamps: bool, output: &Output) -> Result<()> {
    if !credentials && !timestamps {
        output.warn("Nothing to clear. Use --credentials and/or --timestamps.");
        return Ok(());
    }

    let path_manager = PathManager::default();
    let mut store = CredentialStore::new(path_manager.credentials_file());
    store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials: {}", e))?;

    if credentials {
        store.clear_tracker_tokens();
        output.success("Cleared tracking-service tokens.");
    }
    if timestamps {
        store.remove("tracker_last_sync");
        output.success("Cleared the recorded last sync time.");
    }

    store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))?;
    Ok(())
}
