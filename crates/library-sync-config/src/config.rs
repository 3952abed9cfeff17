use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracker: Option<TrackerConfig>,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub sync: SyncTuning,
    /// Run an incremental sync automatically when the app starts.
    #[serde(default)]
    pub auto_sync: bool,
}

/// OAuth application credentials for the tracking service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackerConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_tracker_api_url")]
    pub api_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetadataConfig {
    #[serde(default = "default_tracker_api_url")]
    pub api_url: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_url: default_tracker_api_url(),
        }
    }
}

/// Policy constants of the import engine, surfaced as configuration so the
/// documented defaults stay in one place.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct SyncTuning {
    /// A calendar date with MORE THAN this many watched episodes of one
    /// series counts as a binge day.
    #[serde(default = "default_binge_day_episode_threshold")]
    pub binge_day_episode_threshold: usize,

    /// How far the incremental sync cursor is moved back behind the latest
    /// known local watch date, to absorb clock skew between the service and
    /// local storage.
    #[serde(default = "default_cursor_overlap_minutes")]
    pub cursor_overlap_minutes: i64,
}

pub fn default_binge_day_episode_threshold() -> usize {
    4
}

pub fn default_cursor_overlap_minutes() -> i64 {
    60
}

fn default_tracker_api_url() -> String {
    "https://api.trakt.tv".to_string()
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            binge_day_episode_threshold: default_binge_day_episode_threshold(),
            cursor_overlap_minutes: default_cursor_overlap_minutes(),
        }
    }
}

impl SyncTuning {
    pub fn cursor_overlap(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cursor_overlap_minutes)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file {:?}", path))?;
        Ok(())
    }
}
