use async_trait::async_trait;
use library_sync_config::MetadataConfig;
use library_sync_models::{MovieDetails, SeasonDetails, SeriesDetails};
use reqwest::Client;
use std::sync::Arc;

use crate::error::SourceError;
use crate::traits::MetadataClient;
use crate::trakt::{api, auth};

/// Metadata lookups against the tracking service's public summary
/// endpoints. These only need the application's client id, no user token.
#[derive(Clone)]
pub struct TraktMetadataClient {
    client: Arc<Client>,
    api_url: String,
    client_id: String,
}

impl TraktMetadataClient {
    pub fn new(config: &MetadataConfig, client_id: String) -> Self {
        Self {
            client: Arc::new(auth::create_http_client()),
            api_url: config.api_url.clone(),
            client_id,
        }
    }
}

#[async_trait]
impl MetadataClient for TraktMetadataClient {
    async fn get_movie_details(&self, source_id: u64) -> Result<MovieDetails, SourceError> {
        api::get_movie_details(&self.client, &self.api_url, &self.client_id, source_id).await
    }

    async fn get_series_details(&self, source_id: u64) -> Result<SeriesDetails, SourceError> {
        api::get_series_details(&self.client, &self.api_url, &self.client_id, source_id).await
    }

    async fn get_season_details(
        &self,
        source_id: u64,
        season: u32,
    ) -> Result<SeasonDetails, SourceError> {
        api::get_season_details(
            &self.client,
            &self.api_url,
            &self.client_id,
            source_id,
            season,
        )
        .await
    }
}
