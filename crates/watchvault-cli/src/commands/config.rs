use color_eyre::Result;
use library_sync_config::{Config, PathManager, TrackerConfig};

use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(output),
        ConfigCommands::Tracker {
            client_id,
            client_secret,
        } => configure_tracker(client_id, client_secret, output),
        ConfigCommands::AutoSync { enabled } => set_auto_sync(&enabled, output),
    }
}

fn load_config(path_manager: &PathManager) -> Result<Config> {
    Config::load(&path_manager.config_file()).map_err(|e| {
        color_eyre::eyre::eyre!(
            "Failed to load config from {}: {}",
            path_manager.config_file().display(),
            e
        )
    })
}

fn save_config(config: &Config, path_manager: &PathManager) -> Result<()> {
    config.save(&path_manager.config_file()).map_err(|e| {
        color_eyre::eyre::eyre!(
            "Failed to save config to {}: {}",
            path_manager.config_file().display(),
            e
        )
    })
}

fn mask(secret: &str) -> String {
    if secret.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &secret[..4])
    }
}

fn show_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config = load_config(&path_manager)?;

    if output.format() != OutputFormat::Human {
        output.json(&serde_json::json!({
            "config_file": path_manager.config_file(),
            "tracker_configured": config.tracker.is_some(),
            "auto_sync": config.auto_sync,
            "binge_day_episode_threshold": config.sync.binge_day_episode_threshold,
            "cursor_overlap_minutes": config.sync.cursor_overlap_minutes,
        }));
        return Ok(());
    }

    output.println(format!("Config file: {:?}", path_manager.config_file()));
    match &config.tracker {
        Some(tracker) => {
            output.println(format!("Tracker client ID: {}", mask(&tracker.client_id)));
            output.println(format!("Tracker API URL: {}", tracker.api_url));
        }
        None => output.warn("Tracking service not configured."),
    }
    output.println(format!(
        "Auto-sync: {}",
        if config.auto_sync { "enabled" } else { "disabled" }
    ));
    output.println(format!(
        "Binge-day episode threshold: {}",
        config.sync.binge_day_episode_threshold
    ));
    output.println(format!(
        "Sync cursor overlap: {} minutes",
        config.sync.cursor_overlap_minutes
    ));
    Ok(())
}

fn configure_tracker(
    client_id: Option<String>,
    client_secret: Option<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    let mut config = load_config(&path_manager)?;

    let client_id: String = match client_id {
        Some(id) => id,
        None => dialoguer::Input::new()
            .with_prompt("Tracker API client ID")
            .interact_text()?,
    };
    let client_secret = match client_secret {
        Some(secret) => secret,
        None => rpassword::prompt_password("Tracker API client secret: ")
            .map_err(|e| color_eyre::eyre::eyre!("Failed to read secret: {}", e))?,
    };

    if client_id.is_empty() || client_secret.is_empty() {
        return Err(color_eyre::eyre::eyre!(
            "Client ID and client secret are required"
        ));
    }

    let api_url = config
        .tracker
        .as_ref()
        .map(|t| t.api_url.clone())
        .unwrap_or_else(|| "https://api.trakt.tv".to_string());

    config.tracker = Some(TrackerConfig {
        client_id,
        client_secret,
        api_url,
    });
    save_config(&config, &path_manager)?;

    output.success(
        "Tracker credentials saved. The OAuth authorization runs on the next import or sync.",
    );
    Ok(())
}

fn set_auto_sync(enabled: &str, output: &Output) -> Result<()> {
    let value = match enabled {
        "on" | "true" | "yes" => true,
        "off" | "false" | "no" => false,
        other => {
            output.error(format!("Expected 'on' or 'off', got '{}'", other));
            return Ok(());
        }
    };

    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create configuration directories: {}", e))?;
    let mut config = load_config(&path_manager)?;
    config.auto_sync = value;
    save_config(&config, &path_manager)?;

    output.success(format!(
        "Auto-sync {}.",
        if value { "enabled" } else { "disabled" }
    ));
    Ok(())
}
