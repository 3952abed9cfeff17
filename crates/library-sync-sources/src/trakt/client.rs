use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use library_sync_config::{CredentialStore, PathManager, TrackerConfig};
use library_sync_models::{HistoryItem, WatchedSeriesRecord};
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::error::SourceError;
use crate::traits::SourceClient;
use crate::trakt::{api, auth};

/// Authenticated client for the tracking service. The service reports full
/// watched state; `since` windows are applied client-side the way the API
/// consumers expect.
#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    api_url: String,
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
}

impl TraktClient {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            client: Arc::new(auth::create_http_client()),
            api_url: config.api_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            access_token: None,
        }
    }

    /// Establish a usable access token: reuse a saved one when it is still
    /// valid, refresh or re-authorize otherwise. Tokens are persisted in the
    /// credential store.
    pub async fn authenticate(&mut self) -> anyhow::Result<()> {
        let path_manager = PathManager::default();
        let mut cred_store = CredentialStore::new(path_manager.credentials_file());
        cred_store.load()?;

        if let Some(saved_token) = cred_store.get_tracker_access_token() {
            if let Some(expires_at) = cred_store.get_tracker_token_expires() {
                // Valid if it expires more than 5 minutes from now
                if expires_at > Utc::now() + Duration::minutes(5) {
                    self.access_token = Some(saved_token.clone());
                    info!("Using saved access token (expires at {})", expires_at);
                    return Ok(());
                }
                info!(
                    "Access token expired or expiring soon (expires at {}), refreshing",
                    expires_at
                );
            }
        }

        let refresh_token = cred_store.get_tracker_refresh_token().map(|s| s.as_str());
        let token_info = auth::authenticate(
            &self.api_url,
            &self.client_id,
            &self.client_secret,
            refresh_token,
        )
        .await?;

        self.access_token = Some(token_info.access_token.clone());

        cred_store.set_tracker_access_token(token_info.access_token);
        cred_store.set_tracker_refresh_token(token_info.refresh_token);
        cred_store.set_tracker_token_expires(token_info.expires_at);
        cred_store.save()?;

        info!("Authenticated to the tracking service");
        Ok(())
    }

    /// Pick up a still-valid saved token without ever going interactive.
    /// Returns whether one was found; callers that need a token regardless
    /// use `authenticate`.
    pub fn load_saved_token(&mut self) -> anyhow::Result<bool> {
        let path_manager = PathManager::default();
        let mut cred_store = CredentialStore::new(path_manager.credentials_file());
        cred_store.load()?;

        if let (Some(token), Some(expires_at)) = (
            cred_store.get_tracker_access_token(),
            cred_store.get_tracker_token_expires(),
        ) {
            if expires_at > Utc::now() + Duration::minutes(5) {
                self.access_token = Some(token.clone());
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn access_token(&self) -> Result<&str, SourceError> {
        self.access_token
            .as_deref()
            .ok_or(SourceError::NotAuthenticated)
    }

    fn credential_store(&self) -> Result<CredentialStore, SourceError> {
        let path_manager = PathManager::default();
        let mut store = CredentialStore::new(path_manager.credentials_file());
        store
            .load()
            .map_err(|e| SourceError::other(format!("failed to load credentials: {}", e)))?;
        Ok(store)
    }
}

/// Keep items watched after `since`; items without a timestamp are kept so a
/// window can never hide them.
fn filter_since<T>(
    items: Vec<T>,
    since: Option<DateTime<Utc>>,
    get_timestamp: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Vec<T> {
    match since {
        Some(since) => items
            .into_iter()
            .filter(|item| get_timestamp(item).map(|ts| ts > since).unwrap_or(true))
            .collect(),
        None => items,
    }
}

#[async_trait]
impl SourceClient for TraktClient {
    fn source_name(&self) -> &str {
        "trakt"
    }

    fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    async fn get_watched_movies(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryItem>, SourceError> {
        let token = self.access_token()?;
        let movies =
            api::get_watched_movies(&self.client, &self.api_url, token, &self.client_id).await?;
        Ok(filter_since(movies, since, |m| m.watched_at))
    }

    async fn get_watched_shows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<WatchedSeriesRecord>, SourceError> {
        let token = self.access_token()?;
        let shows =
            api::get_watched_shows(&self.client, &self.api_url, token, &self.client_id).await?;

        let Some(since) = since else {
            return Ok(shows);
        };

        // Window applies per episode; shows left with no episodes drop out
        let mut windowed = Vec::new();
        for mut show in shows {
            show.episodes = filter_since(show.episodes, Some(since), |e| e.watched_at);
            if !show.episodes.is_empty() {
                windowed.push(show);
            }
        }
        Ok(windowed)
    }

    async fn get_watchlist(&self) -> Result<Vec<HistoryItem>, SourceError> {
        let token = self.access_token()?;
        api::get_watchlist(&self.client, &self.api_url, token, &self.client_id).await
    }

    async fn get_ratings(&self) -> Result<Vec<HistoryItem>, SourceError> {
        let token = self.access_token()?;
        api::get_ratings(&self.client, &self.api_url, token, &self.client_id).await
    }

    fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.credential_store()
            .ok()
            .and_then(|store| store.get_last_sync_time())
    }

    async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), SourceError> {
        let mut store = self.credential_store()?;
        store.set_last_sync_time(at);
        store
            .save()
            .map_err(|e| SourceError::other(format!("failed to save credentials: {}", e)))
    }
}
