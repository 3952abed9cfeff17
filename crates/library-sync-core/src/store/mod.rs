pub mod json;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use library_sync_models::{EpisodeWatch, LocalId, NewMovie, NewSeries, SeasonDetails};
use serde::Serialize;
use thiserror::Error;

use crate::binge::AirDateIndex;

pub use json::JsonLibraryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("library storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("library storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no library entry with id {0}")]
    MissingEntry(LocalId),

    #[error("library store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LibraryStats {
    pub movies: usize,
    pub series: usize,
    pub watch_sessions: usize,
    pub episode_watches: usize,
}

/// The persistence collaborator. Atomic per-row CRUD plus the existence
/// checks the import engine needs; no transactions across calls.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn find_movie(&self, source_id: u64) -> Result<Option<LocalId>, StoreError>;

    async fn find_series(&self, source_id: u64) -> Result<Option<LocalId>, StoreError>;

    async fn insert_movie(&self, movie: NewMovie) -> Result<LocalId, StoreError>;

    async fn insert_series(&self, series: NewSeries) -> Result<LocalId, StoreError>;

    async fn insert_watch_session(
        &self,
        movie_id: LocalId,
        watched_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Whether the movie already has a watch session on the given calendar
    /// date. Guards against duplicate sessions on repeated syncs.
    async fn watch_session_exists_on(
        &self,
        movie_id: LocalId,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// Record an episode as watched. At most one record per
    /// (series, season, episode); returns false when it already existed.
    async fn record_episode_watch(
        &self,
        series_id: LocalId,
        watch: &EpisodeWatch,
    ) -> Result<bool, StoreError>;

    /// Set the rating only when the entry has none yet; returns whether a
    /// write happened.
    async fn backfill_movie_rating(
        &self,
        movie_id: LocalId,
        rating: u8,
    ) -> Result<bool, StoreError>;

    async fn backfill_series_rating(
        &self,
        series_id: LocalId,
        rating: u8,
    ) -> Result<bool, StoreError>;

    /// Season numbers whose episode metadata is already stored locally.
    async fn known_seasons(&self, series_id: LocalId) -> Result<Vec<u32>, StoreError>;

    async fn store_season(
        &self,
        series_id: LocalId,
        season: &SeasonDetails,
    ) -> Result<(), StoreError>;

    /// Air dates of every locally known episode of the series.
    async fn episode_air_dates(&self, series_id: LocalId) -> Result<AirDateIndex, StoreError>;

    /// Most recent watch timestamp across movie sessions and episode
    /// records, the anchor for the incremental sync cursor.
    async fn latest_watch_date(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn stats(&self) -> Result<LibraryStats, StoreError>;
}
