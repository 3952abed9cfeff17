use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use library_sync_config::SyncTuning;
use library_sync_models::{
    EpisodeDetails, EpisodeWatch, HistoryItem, MediaKind, MovieDetails, SeasonDetails,
    SeriesDetails, WatchedSeriesRecord,
};
use library_sync_sources::{MetadataClient, SourceClient, SourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::SyncEngine;
use crate::store::JsonLibraryStore;

pub struct MockSource {
    pub movies: Vec<HistoryItem>,
    pub shows: Vec<WatchedSeriesRecord>,
    pub watchlist: Vec<HistoryItem>,
    pub ratings: Vec<HistoryItem>,
    pub authenticated: bool,
    pub fail_movies: bool,
    pub fail_shows: bool,
    pub fail_watchlist: bool,
    pub last_sync: Mutex<Option<DateTime<Utc>>>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            movies: Vec::new(),
            shows: Vec::new(),
            watchlist: Vec::new(),
            ratings: Vec::new(),
            authenticated: true,
            fail_movies: false,
            fail_shows: false,
            fail_watchlist: false,
            last_sync: Mutex::new(None),
        }
    }
}

fn since_filter<T: Clone>(
    items: &[T],
    since: Option<DateTime<Utc>>,
    get_timestamp: impl Fn(&T) -> Option<DateTime<Utc>>,
) -> Vec<T> {
    items
        .iter()
        .filter(|item| match since {
            Some(since) => get_timestamp(item).map(|ts| ts > since).unwrap_or(true),
            None => true,
        })
        .cloned()
        .collect()
}

#[async_trait]
impl SourceClient for MockSource {
    fn source_name(&self) -> &str {
        "mock"
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn get_watched_movies(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryItem>, SourceError> {
        if self.fail_movies {
            return Err(SourceError::other("movies endpoint down"));
        }
        Ok(since_filter(&self.movies, since, |m| m.watched_at))
    }

    async fn get_watched_shows(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<WatchedSeriesRecord>, SourceError> {
        if self.fail_shows {
            return Err(SourceError::other("shows endpoint down"));
        }
        let mut out = Vec::new();
        for show in &self.shows {
            let mut show = show.clone();
            show.episodes = since_filter(&show.episodes, since, |e| e.watched_at);
            if !show.episodes.is_empty() {
                out.push(show);
            }
        }
        Ok(out)
    }

    async fn get_watchlist(&self) -> Result<Vec<HistoryItem>, SourceError> {
        if self.fail_watchlist {
            return Err(SourceError::other("watchlist endpoint down"));
        }
        Ok(self.watchlist.clone())
    }

    async fn get_ratings(&self) -> Result<Vec<HistoryItem>, SourceError> {
        Ok(self.ratings.clone())
    }

    fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.lock().unwrap()
    }

    async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), SourceError> {
        *self.last_sync.lock().unwrap() = Some(at);
        Ok(())
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct MockMetadata {
    pub seasons: HashMap<(u64, u32), SeasonDetails>,
    pub movie_detail_calls: AtomicUsize,
    pub season_detail_calls: AtomicUsize,
    /// Invoked on every movie-details lookup; lets a test cancel the job
    /// while an item is in flight.
    pub on_movie_details: Mutex<Option<Hook>>,
}

impl MockMetadata {
    pub fn with_season(mut self, source_id: u64, season: SeasonDetails) -> Self {
        self.seasons.insert((source_id, season.season), season);
        self
    }
}

#[async_trait]
impl MetadataClient for MockMetadata {
    async fn get_movie_details(&self, source_id: u64) -> Result<MovieDetails, SourceError> {
        self.movie_detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_movie_details.lock().unwrap().as_ref() {
            hook();
        }
        Ok(MovieDetails {
            source_id,
            title: format!("Movie {}", source_id),
            year: Some(2000),
            overview: None,
            poster_url: None,
        })
    }

    async fn get_series_details(&self, source_id: u64) -> Result<SeriesDetails, SourceError> {
        Ok(SeriesDetails {
            source_id,
            title: format!("Series {}", source_id),
            year: Some(2010),
            overview: None,
            poster_url: None,
        })
    }

    async fn get_season_details(
        &self,
        source_id: u64,
        season: u32,
    ) -> Result<SeasonDetails, SourceError> {
        self.season_detail_calls.fetch_add(1, Ordering::SeqCst);
        self.seasons
            .get(&(source_id, season))
            .cloned()
            .ok_or_else(|| SourceError::other(format!("no metadata for season {}", season)))
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn movie_item(source_id: u64, title: &str, watched_at: Option<DateTime<Utc>>) -> HistoryItem {
    HistoryItem {
        source_id,
        title: title.to_string(),
        year: Some(2000),
        kind: MediaKind::Movie,
        watched_at,
        source_rating: None,
    }
}

pub fn watchlist_item(source_id: u64, title: &str, kind: MediaKind) -> HistoryItem {
    HistoryItem {
        source_id,
        title: title.to_string(),
        year: Some(2000),
        kind,
        watched_at: None,
        source_rating: None,
    }
}

pub fn episode(season: u32, number: u32, watched_at: Option<DateTime<Utc>>) -> EpisodeWatch {
    EpisodeWatch {
        season,
        episode: number,
        watched_at,
    }
}

pub fn series_record(source_id: u64, title: &str, episodes: Vec<EpisodeWatch>) -> WatchedSeriesRecord {
    let last_watched_at = episodes.iter().filter_map(|e| e.watched_at).max();
    WatchedSeriesRecord {
        source_id,
        title: title.to_string(),
        year: Some(2010),
        last_watched_at,
        episodes,
        source_rating: None,
    }
}

pub fn season_with_air_dates(season: u32, episodes: &[(u32, chrono::NaiveDate)]) -> SeasonDetails {
    SeasonDetails {
        season,
        episodes: episodes
            .iter()
            .map(|(number, air_date)| EpisodeDetails {
                season,
                episode: *number,
                title: None,
                air_date: Some(*air_date),
            })
            .collect(),
    }
}

pub struct TestEngine {
    pub engine: SyncEngine,
    pub store: Arc<JsonLibraryStore>,
    pub metadata: Arc<MockMetadata>,
}

pub fn engine_with(source: MockSource, metadata: MockMetadata) -> TestEngine {
    engine_with_store(source, metadata, Arc::new(JsonLibraryStore::in_memory()))
}

pub fn engine_with_store(
    source: MockSource,
    metadata: MockMetadata,
    store: Arc<JsonLibraryStore>,
) -> TestEngine {
    let metadata = Arc::new(metadata);
    let engine = SyncEngine::new(
        Arc::new(source),
        metadata.clone(),
        store.clone(),
        SyncTuning::default(),
        false,
    );
    TestEngine {
        engine,
        store,
        metadata,
    }
}
