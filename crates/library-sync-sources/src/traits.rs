use async_trait::async_trait;
use chrono::{DateTime, Utc};
use library_sync_models::{
    HistoryItem, MovieDetails, SeasonDetails, SeriesDetails, WatchedSeriesRecord,
};

use crate::error::SourceError;

/// The external tracking service: watch history, watchlist and ratings.
/// Rate limiting and token refresh are the implementation's concern; the
/// import engine only sees `Result`s.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source_name(&self) -> &str;

    fn is_authenticated(&self) -> bool;

    /// Watched movies, optionally restricted to watches after `since`.
    async fn get_watched_movies(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryItem>, SourceError>;

    /// Watched shows with their per-episode watch records, optionally
    /// restricted to episodes watched after `since`.
    async fn get_watched_shows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<WatchedSeriesRecord>, SourceError>;

    /// The user's current watchlist (movies and shows, no watch data).
    async fn get_watchlist(&self) -> Result<Vec<HistoryItem>, SourceError>;

    /// The user's ratings on the service's native 1-10 scale, keyed by
    /// source id. Returned as history items with `source_rating` set.
    async fn get_ratings(&self) -> Result<Vec<HistoryItem>, SourceError>;

    fn last_sync_time(&self) -> Option<DateTime<Utc>>;

    async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), SourceError>;
}

/// The metadata collaborator: resolves a source id to titles, posters,
/// episode lists and air dates.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn get_movie_details(&self, source_id: u64) -> Result<MovieDetails, SourceError>;

    async fn get_series_details(&self, source_id: u64) -> Result<SeriesDetails, SourceError>;

    async fn get_season_details(
        &self,
        source_id: u64,
        season: u32,
    ) -> Result<SeasonDetails, SourceError>;
}
