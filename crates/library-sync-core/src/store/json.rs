use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use library_sync_models::{
    EpisodeRecord, EpisodeWatch, LocalId, MovieEntry, NewMovie, NewSeries, SeasonDetails,
    SeriesEntry, WatchSession,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::binge::AirDateIndex;
use crate::store::{LibraryStats, LibraryStore, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct StoredSeason {
    series_id: LocalId,
    #[serde(flatten)]
    details: SeasonDetails,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryData {
    next_id: u64,
    movies: Vec<MovieEntry>,
    series: Vec<SeriesEntry>,
    sessions: Vec<WatchSession>,
    episodes: Vec<EpisodeRecord>,
    seasons: Vec<StoredSeason>,
}

impl LibraryData {
    fn alloc_id(&mut self) -> LocalId {
        self.next_id += 1;
        self.next_id
    }
}

/// Library storage persisted as one JSON document. Every mutation rewrites
/// the file; the library is small enough that this beats partial-write
/// corruption handling.
pub struct JsonLibraryStore {
    path: Option<PathBuf>,
    data: Mutex<LibraryData>,
}

impl JsonLibraryStore {
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let data: LibraryData = serde_json::from_str(&content)?;
            info!(
                "Opened library at {:?} ({} movies, {} series)",
                path,
                data.movies.len(),
                data.series.len()
            );
            data
        } else {
            debug!("No library file at {:?}, starting empty", path);
            LibraryData::default()
        };
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    /// Volatile store with identical semantics, for tests.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(LibraryData::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LibraryData>, StoreError> {
        self.data.lock().map_err(|_| StoreError::Poisoned)
    }

    fn persist(&self, data: &LibraryData) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
impl JsonLibraryStore {
    pub(crate) fn sessions_snapshot(&self) -> Vec<WatchSession> {
        self.data.lock().unwrap().sessions.clone()
    }

    pub(crate) fn episodes_snapshot(&self) -> Vec<EpisodeRecord> {
        self.data.lock().unwrap().episodes.clone()
    }

    pub(crate) fn movies_snapshot(&self) -> Vec<MovieEntry> {
        self.data.lock().unwrap().movies.clone()
    }
}

#[async_trait]
impl LibraryStore for JsonLibraryStore {
    async fn find_movie(&self, source_id: u64) -> Result<Option<LocalId>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .movies
            .iter()
            .find(|m| m.movie.source_id == source_id)
            .map(|m| m.id))
    }

    async fn find_series(&self, source_id: u64) -> Result<Option<LocalId>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .series
            .iter()
            .find(|s| s.series.source_id == source_id)
            .map(|s| s.id))
    }

    async fn insert_movie(&self, movie: NewMovie) -> Result<LocalId, StoreError> {
        let mut data = self.lock()?;
        let id = data.alloc_id();
        data.movies.push(MovieEntry { id, movie });
        self.persist(&data)?;
        Ok(id)
    }

    async fn insert_series(&self, series: NewSeries) -> Result<LocalId, StoreError> {
        let mut data = self.lock()?;
        let id = data.alloc_id();
        data.series.push(SeriesEntry { id, series });
        self.persist(&data)?;
        Ok(id)
    }

    async fn insert_watch_session(
        &self,
        movie_id: LocalId,
        watched_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        if !data.movies.iter().any(|m| m.id == movie_id) {
            return Err(StoreError::MissingEntry(movie_id));
        }
        data.sessions.push(WatchSession {
            movie_id,
            watched_at,
        });
        self.persist(&data)?;
        Ok(())
    }

    async fn watch_session_exists_on(
        &self,
        movie_id: LocalId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let data = self.lock()?;
        Ok(data.sessions.iter().any(|s| {
            s.movie_id == movie_id && s.watched_at.map(|ts| ts.date_naive()) == Some(date)
        }))
    }

    async fn record_episode_watch(
        &self,
        series_id: LocalId,
        watch: &EpisodeWatch,
    ) -> Result<bool, StoreError> {
        let mut data = self.lock()?;
        if !data.series.iter().any(|s| s.id == series_id) {
            return Err(StoreError::MissingEntry(series_id));
        }
        let exists = data.episodes.iter().any(|e| {
            e.series_id == series_id && e.season == watch.season && e.episode == watch.episode
        });
        if exists {
            return Ok(false);
        }
        data.episodes.push(EpisodeRecord {
            series_id,
            season: watch.season,
            episode: watch.episode,
            watched_at: watch.watched_at,
        });
        self.persist(&data)?;
        Ok(true)
    }

    async fn backfill_movie_rating(
        &self,
        movie_id: LocalId,
        rating: u8,
    ) -> Result<bool, StoreError> {
        let mut data = self.lock()?;
        let entry = data
            .movies
            .iter_mut()
            .find(|m| m.id == movie_id)
            .ok_or(StoreError::MissingEntry(movie_id))?;
        if entry.movie.rating.is_some() {
            return Ok(false);
        }
        entry.movie.rating = Some(rating);
        self.persist(&data)?;
        Ok(true)
    }

    async fn backfill_series_rating(
        &self,
        series_id: LocalId,
        rating: u8,
    ) -> Result<bool, StoreError> {
        let mut data = self.lock()?;
        let entry = data
            .series
            .iter_mut()
            .find(|s| s.id == series_id)
            .ok_or(StoreError::MissingEntry(series_id))?;
        if entry.series.rating.is_some() {
            return Ok(false);
        }
        entry.series.rating = Some(rating);
        self.persist(&data)?;
        Ok(true)
    }

    async fn known_seasons(&self, series_id: LocalId) -> Result<Vec<u32>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .seasons
            .iter()
            .filter(|s| s.series_id == series_id)
            .map(|s| s.details.season)
            .collect())
    }

    async fn store_season(
        &self,
        series_id: LocalId,
        season: &SeasonDetails,
    ) -> Result<(), StoreError> {
        let mut data = self.lock()?;
        if !data.series.iter().any(|s| s.id == series_id) {
            return Err(StoreError::MissingEntry(series_id));
        }
        // Replace on re-fetch rather than accumulating duplicates
        data.seasons
            .retain(|s| !(s.series_id == series_id && s.details.season == season.season));
        data.seasons.push(StoredSeason {
            series_id,
            details: season.clone(),
        });
        self.persist(&data)?;
        Ok(())
    }

    async fn episode_air_dates(&self, series_id: LocalId) -> Result<AirDateIndex, StoreError> {
        let data = self.lock()?;
        let mut index = AirDateIndex::new();
        for season in data.seasons.iter().filter(|s| s.series_id == series_id) {
            for episode in &season.details.episodes {
                if let Some(air_date) = episode.air_date {
                    index.insert(episode.season, episode.episode, air_date);
                }
            }
        }
        Ok(index)
    }

    async fn latest_watch_date(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let data = self.lock()?;
        let latest_session = data.sessions.iter().filter_map(|s| s.watched_at).max();
        let latest_episode = data.episodes.iter().filter_map(|e| e.watched_at).max();
        Ok(latest_session.max(latest_episode))
    }

    async fn stats(&self) -> Result<LibraryStats, StoreError> {
        let data = self.lock()?;
        Ok(LibraryStats {
            movies: data.movies.len(),
            series: data.series.len(),
            watch_sessions: data.sessions.len(),
            episode_watches: data.episodes.len(),
        })
    }
}
