use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value store for tokens and sync timestamps, persisted as TOML
/// next to the config file.
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    fn get_datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    // Tracking-service tokens

    pub fn get_tracker_access_token(&self) -> Option<&String> {
        self.get("tracker_access_token")
    }

    pub fn set_tracker_access_token(&mut self, token: String) {
        self.set("tracker_access_token".to_string(), token);
    }

    pub fn get_tracker_refresh_token(&self) -> Option<&String> {
        self.get("tracker_refresh_token")
    }

    pub fn set_tracker_refresh_token(&mut self, token: String) {
        self.set("tracker_refresh_token".to_string(), token);
    }

    pub fn get_tracker_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get_datetime("tracker_token_expires")
    }

    pub fn set_tracker_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set("tracker_token_expires".to_string(), expires.to_rfc3339());
    }

    pub fn clear_tracker_tokens(&mut self) {
        self.remove("tracker_access_token");
        self.remove("tracker_refresh_token");
        self.remove("tracker_token_expires");
    }

    // Sync bookkeeping

    pub fn get_last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.get_datetime("tracker_last_sync")
    }

    pub fn set_last_sync_time(&mut self, at: DateTime<Utc>) {
        self.set("tracker_last_sync".to_string(), at.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_credential_store_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_tracker_access_token("access".to_string());
        store.set_tracker_refresh_token("refresh".to_string());
        store.save().unwrap();

        let mut loaded = CredentialStore::new(path);
        loaded.load().unwrap();
        assert_eq!(
            loaded.get_tracker_access_token(),
            Some(&"access".to_string())
        );
        assert_eq!(
            loaded.get_tracker_refresh_token(),
            Some(&"refresh".to_string())
        );
    }

    #[test]
    fn test_token_expiry_roundtrip() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.set_tracker_token_expires(expires);
        store.save().unwrap();

        let mut loaded = CredentialStore::new(path);
        loaded.load().unwrap();
        let loaded_expires = loaded.get_tracker_token_expires().unwrap();
        // Allow 1 second difference for serialization
        assert!((loaded_expires - expires).num_seconds().abs() < 2);
    }

    #[test]
    fn test_clear_tracker_tokens() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set_tracker_access_token("a".to_string());
        store.set_tracker_refresh_token("r".to_string());
        store.set_last_sync_time(Utc::now());

        store.clear_tracker_tokens();
        assert!(store.get_tracker_access_token().is_none());
        assert!(store.get_tracker_refresh_token().is_none());
        // Sync bookkeeping survives a token reset
        assert!(store.get_last_sync_time().is_some());
    }
}
