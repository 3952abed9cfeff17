use library_sync_models::{
    HistoryItem, ImportOptions, MediaKind, NewMovie, NewSeries, WatchedSeriesRecord,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

use crate::binge::{apply_air_date_correction, binge_days};
use crate::dedup::dedupe_by_source_id;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::rating::map_source_rating;

/// How episode watches are written for a series that is not yet in the
/// library. Bulk imports correct binge-day timestamps; incremental syncs
/// trust the reported timestamps verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EpisodeMode {
    BingeCorrected,
    Simple,
}

/// One error string per failed item; shared by the full importer and the
/// sync passes so both report in the same shape.
pub(crate) fn item_error(kind: &str, title: &str, err: &SyncError) -> String {
    format!("{} '{}': {}", kind, title, err)
}

/// Fill missing `source_rating`s from the ratings endpoint. Ratings already
/// present on an item win.
fn overlay_ratings(
    movies: &mut [HistoryItem],
    shows: &mut [WatchedSeriesRecord],
    ratings: &[HistoryItem],
) {
    let by_id: HashMap<(u64, MediaKind), u8> = ratings
        .iter()
        .filter_map(|r| r.source_rating.map(|v| ((r.source_id, r.kind), v)))
        .collect();

    for movie in movies.iter_mut() {
        if movie.source_rating.is_none() {
            movie.source_rating = by_id.get(&(movie.source_id, MediaKind::Movie)).copied();
        }
    }
    for show in shows.iter_mut() {
        if show.source_rating.is_none() {
            show.source_rating = by_id.get(&(show.source_id, MediaKind::Series)).copied();
        }
    }
}

impl SyncEngine {
    /// Body of one full import run. Runs detached from the caller that
    /// started it; progress and errors are only visible through the job
    /// controller. Movies are processed before series, items strictly in
    /// order, and cancellation is honored between items, never mid-item.
    pub(crate) async fn run_full_import(&self, options: ImportOptions) {
        let mut movies = if options.import_movies {
            match self.source.get_watched_movies(None).await {
                Ok(items) => dedupe_by_source_id(items),
                Err(e) => {
                    self.jobs
                        .record_error(format!("failed to fetch watched movies: {}", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut shows = if options.import_series {
            match self.source.get_watched_shows(None).await {
                Ok(records) => dedupe_by_source_id(records),
                Err(e) => {
                    self.jobs
                        .record_error(format!("failed to fetch watched shows: {}", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let watchlist = if options.import_watchlist {
            match self.source.get_watchlist().await {
                Ok(items) => dedupe_by_source_id(items),
                Err(e) => {
                    self.jobs
                        .record_error(format!("failed to fetch watchlist: {}", e));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if options.import_ratings {
            match self.source.get_ratings().await {
                Ok(ratings) => overlay_ratings(&mut movies, &mut shows, &ratings),
                Err(e) => {
                    self.jobs
                        .record_error(format!("failed to fetch ratings: {}", e));
                }
            }
        } else {
            for movie in &mut movies {
                movie.source_rating = None;
            }
            for show in &mut shows {
                show.source_rating = None;
            }
        }

        self.jobs
            .set_total(movies.len() + shows.len() + watchlist.len());

        let mut cancelled = false;

        for item in &movies {
            if self.jobs.cancel_requested() {
                cancelled = true;
                break;
            }
            self.jobs.set_current_item(&item.title);
            if let Err(e) = self.import_movie_item(item).await {
                self.jobs.record_error(item_error("movie", &item.title, &e));
            }
            self.jobs.item_finished();
        }

        if !cancelled {
            for record in &shows {
                if self.jobs.cancel_requested() {
                    cancelled = true;
                    break;
                }
                self.jobs.set_current_item(&record.title);
                if let Err(e) = self
                    .import_series_item(record, EpisodeMode::BingeCorrected)
                    .await
                {
                    self.jobs
                        .record_error(item_error("series", &record.title, &e));
                }
                self.jobs.item_finished();
            }
        }

        if !cancelled {
            for item in &watchlist {
                if self.jobs.cancel_requested() {
                    cancelled = true;
                    break;
                }
                self.jobs.set_current_item(&item.title);
                if let Err(e) = self.import_watchlist_item(item).await {
                    self.jobs
                        .record_error(item_error("watchlist item", &item.title, &e));
                }
                self.jobs.item_finished();
            }
        }

        let state = self.jobs.snapshot();
        info!(
            completed = state.completed,
            total = state.total,
            errors = state.errors.len(),
            cancelled,
            "Full import finished"
        );
        self.jobs.finish();
    }

    /// Import or reconcile one watched movie. Returns whether a new watch
    /// session was recorded.
    pub(crate) async fn import_movie_item(&self, item: &HistoryItem) -> Result<bool, SyncError> {
        match self.guard.movie_id(item.source_id).await? {
            Some(movie_id) => {
                let mut new_watch = false;
                if let Some(watched_at) = item.watched_at {
                    if !self
                        .guard
                        .session_exists_on(movie_id, watched_at.date_naive())
                        .await?
                    {
                        self.store
                            .insert_watch_session(movie_id, Some(watched_at))
                            .await?;
                        new_watch = true;
                    }
                }
                if let Some(rating) = item.source_rating {
                    self.store
                        .backfill_movie_rating(movie_id, map_source_rating(rating))
                        .await?;
                }
                Ok(new_watch)
            }
            None => {
                let details = self.metadata.get_movie_details(item.source_id).await?;
                let movie_id = self
                    .store
                    .insert_movie(NewMovie {
                        source_id: item.source_id,
                        title: details.title,
                        year: details.year.or(item.year),
                        poster_url: details.poster_url,
                        rating: item.source_rating.map(map_source_rating),
                        on_watchlist: false,
                    })
                    .await?;
                self.store
                    .insert_watch_session(movie_id, item.watched_at)
                    .await?;
                Ok(true)
            }
        }
    }

    /// Import or reconcile one watched series. Returns the number of newly
    /// recorded episode watches. `mode` only applies when the series is not
    /// yet in the library; episodes of an already tracked series are always
    /// written verbatim, its incremental data is assumed clean.
    pub(crate) async fn import_series_item(
        &self,
        record: &WatchedSeriesRecord,
        mode: EpisodeMode,
    ) -> Result<usize, SyncError> {
        match self.guard.series_id(record.source_id).await? {
            Some(series_id) => {
                self.ensure_seasons(series_id, record).await;
                let mut new_watches = 0;
                for episode in &record.episodes {
                    if self.store.record_episode_watch(series_id, episode).await? {
                        new_watches += 1;
                    }
                }
                if let Some(rating) = record.source_rating {
                    self.store
                        .backfill_series_rating(series_id, map_source_rating(rating))
                        .await?;
                }
                Ok(new_watches)
            }
            None => {
                let details = self.metadata.get_series_details(record.source_id).await?;
                let series_id = self
                    .store
                    .insert_series(NewSeries {
                        source_id: record.source_id,
                        title: details.title,
                        year: details.year.or(record.year),
                        poster_url: details.poster_url,
                        rating: record.source_rating.map(map_source_rating),
                        on_watchlist: false,
                    })
                    .await?;
                self.ensure_seasons(series_id, record).await;

                let episodes = match mode {
                    EpisodeMode::BingeCorrected => {
                        let days = binge_days(
                            &record.episodes,
                            self.tuning.binge_day_episode_threshold,
                        );
                        if days.is_empty() {
                            // No binge day anywhere in the series: trust the
                            // timestamps, skip the air-date index entirely
                            record.episodes.clone()
                        } else {
                            let index = self.store.episode_air_dates(series_id).await?;
                            apply_air_date_correction(
                                record.episodes.clone(),
                                &index,
                                self.tuning.binge_day_episode_threshold,
                            )
                        }
                    }
                    EpisodeMode::Simple => record.episodes.clone(),
                };

                let mut new_watches = 0;
                for episode in &episodes {
                    if self.store.record_episode_watch(series_id, episode).await? {
                        new_watches += 1;
                    }
                }
                Ok(new_watches)
            }
        }
    }

    /// Fetch season metadata for every season touched by the watched
    /// episodes that is not yet known locally. Best effort: a failed season
    /// is logged and skipped, never aborts the series. An incomplete
    /// air-date index only means fewer binge corrections.
    async fn ensure_seasons(&self, series_id: library_sync_models::LocalId, record: &WatchedSeriesRecord) {
        let known: HashSet<u32> = match self.store.known_seasons(series_id).await {
            Ok(seasons) => seasons.into_iter().collect(),
            Err(e) => {
                warn!(
                    series = %record.title,
                    "Failed to read known seasons, skipping season fetch: {}", e
                );
                return;
            }
        };

        let touched: BTreeSet<u32> = record.episodes.iter().map(|e| e.season).collect();
        for season in touched {
            if known.contains(&season) {
                continue;
            }
            match self
                .metadata
                .get_season_details(record.source_id, season)
                .await
            {
                Ok(details) => {
                    if let Err(e) = self.store.store_season(series_id, &details).await {
                        warn!(
                            series = %record.title,
                            season, "Failed to store season metadata: {}", e
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        series = %record.title,
                        season, "Failed to fetch season metadata: {}", e
                    );
                }
            }
        }
    }

    /// Add a watchlist entry to the library without a watch session.
    /// Returns whether a new entry was created.
    pub(crate) async fn import_watchlist_item(&self, item: &HistoryItem) -> Result<bool, SyncError> {
        match item.kind {
            MediaKind::Movie => {
                if self.guard.movie_id(item.source_id).await?.is_some() {
                    return Ok(false);
                }
                let details = self.metadata.get_movie_details(item.source_id).await?;
                self.store
                    .insert_movie(NewMovie {
                        source_id: item.source_id,
                        title: details.title,
                        year: details.year.or(item.year),
                        poster_url: details.poster_url,
                        rating: None,
                        on_watchlist: true,
                    })
                    .await?;
                Ok(true)
            }
            MediaKind::Series => {
                if self.guard.series_id(item.source_id).await?.is_some() {
                    return Ok(false);
                }
                let details = self.metadata.get_series_details(item.source_id).await?;
                self.store
                    .insert_series(NewSeries {
                        source_id: item.source_id,
                        title: details.title,
                        year: details.year.or(item.year),
                        poster_url: details.poster_url,
                        rating: None,
                        on_watchlist: true,
                    })
                    .await?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::store::LibraryStore;
    use crate::testutil::*;
    use chrono::NaiveDate;
    use library_sync_models::NewMovie;

    fn air(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 2, day).unwrap()
    }

    async fn seed_movie(store: &crate::store::JsonLibraryStore, source_id: u64, rating: Option<u8>) {
        store
            .insert_movie(NewMovie {
                source_id,
                title: format!("Movie {}", source_id),
                year: Some(2000),
                poster_url: None,
                rating,
                on_watchlist: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_preview_then_full_import_end_to_end() {
        // 8 watched movies (3 already in the library) and 4 watched series
        let mut source = MockSource::default();
        for id in [101u64, 102, 103, 201, 202, 203, 204, 205] {
            source
                .movies
                .push(movie_item(id, &format!("Movie {}", id), Some(ts(5, 20))));
        }
        for id in [301u64, 302, 303, 304] {
            source.shows.push(series_record(
                id,
                &format!("Series {}", id),
                vec![episode(1, 1, Some(ts(6, 20))), episode(1, 2, Some(ts(7, 20)))],
            ));
        }

        let t = engine_with(source, MockMetadata::default());
        for id in [101u64, 102, 103] {
            seed_movie(&t.store, id, None).await;
        }

        let preview = t
            .engine
            .build_preview(Default::default())
            .await
            .unwrap();
        assert_eq!(preview.total_items(), 12);
        assert_eq!(preview.already_in_library(), 3);
        assert_eq!(preview.new_items(), 9);

        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        let state = t.engine.import_status();
        assert!(!state.in_progress);
        assert_eq!(state.completed, 12);
        assert_eq!(state.total, 12);
        assert!(state.errors.is_empty(), "errors: {:?}", state.errors);

        let stats = t.store.stats().await.unwrap();
        assert_eq!(stats.movies, 8); // 3 seeded + 5 new
        assert_eq!(stats.series, 4);
        assert_eq!(stats.watch_sessions, 8);
        assert_eq!(stats.episode_watches, 8);
    }

    #[tokio::test]
    async fn test_repeated_full_import_is_idempotent() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(2, 21))));
        source.shows.push(series_record(
            10,
            "Severance",
            vec![episode(1, 1, Some(ts(3, 20)))],
        ));

        let t = engine_with(source, MockMetadata::default());

        for _ in 0..2 {
            t.engine.start_import(Default::default()).unwrap();
            t.engine.join_import().await;
            assert!(t.engine.import_status().errors.is_empty());
        }

        let stats = t.store.stats().await.unwrap();
        assert_eq!(stats.movies, 1);
        assert_eq!(stats.series, 1);
        // One session per distinct watched date, one record per episode
        assert_eq!(stats.watch_sessions, 1);
        assert_eq!(stats.episode_watches, 1);
    }

    #[tokio::test]
    async fn test_cancel_before_first_item_starts_nothing() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(2, 21))));
        source.movies.push(movie_item(2, "Ronin", Some(ts(3, 21))));

        let t = engine_with(source, MockMetadata::default());
        t.engine.jobs.try_start().unwrap();
        t.engine.jobs.request_cancel();
        t.engine.run_full_import(Default::default()).await;

        let state = t.engine.import_status();
        assert_eq!(state.completed, 0);
        assert!(!state.in_progress);
        assert_eq!(t.store.stats().await.unwrap().movies, 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_commits_item_in_flight_only() {
        let mut source = MockSource::default();
        for id in 1..=3u64 {
            source
                .movies
                .push(movie_item(id, &format!("Movie {}", id), Some(ts(id as u32, 20))));
        }

        let t = engine_with(source, MockMetadata::default());
        // Cancel while the first item is being processed: the metadata
        // lookup sits in the middle of the new-movie path
        let jobs = t.engine.jobs.clone();
        *t.metadata.on_movie_details.lock().unwrap() =
            Some(Box::new(move || jobs.request_cancel()));

        t.engine.jobs.try_start().unwrap();
        t.engine.run_full_import(Default::default()).await;

        let state = t.engine.import_status();
        assert!(state.cancellation_requested);
        assert_eq!(state.completed, 1);

        // The in-flight item was committed in full, nothing after it started
        let stats = t.store.stats().await.unwrap();
        assert_eq!(stats.movies, 1);
        assert_eq!(stats.watch_sessions, 1);
    }

    #[tokio::test]
    async fn test_new_series_binge_day_gets_air_dates() {
        let mut source = MockSource::default();
        source.shows.push(series_record(
            10,
            "Severance",
            (1..=5).map(|e| episode(1, e, Some(ts(10, e)))).collect(),
        ));

        let metadata = MockMetadata::default().with_season(
            10,
            season_with_air_dates(1, &[(1, air(1)), (2, air(2)), (3, air(3)), (4, air(4))]),
        );
        let t = engine_with(source, metadata);

        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;
        assert!(t.engine.import_status().errors.is_empty());

        let mut episodes = t.store.episodes_snapshot();
        episodes.sort_by_key(|e| e.episode);
        for record in &episodes[..4] {
            let expected = air(record.episode)
                .and_time(chrono::NaiveTime::MIN)
                .and_utc();
            assert_eq!(record.watched_at, Some(expected));
        }
        // Episode 5 has no air date in the index and keeps its timestamp
        assert_eq!(episodes[4].watched_at, Some(ts(10, 5)));
    }

    #[tokio::test]
    async fn test_below_threshold_series_keeps_timestamps() {
        let mut source = MockSource::default();
        source.shows.push(series_record(
            10,
            "Severance",
            (1..=3).map(|e| episode(1, e, Some(ts(10, e)))).collect(),
        ));

        // No season metadata available at all: the fetch is best-effort and
        // the episodes are written with their reported timestamps
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        assert!(t.engine.import_status().errors.is_empty());
        let episodes = t.store.episodes_snapshot();
        assert_eq!(episodes.len(), 3);
        for record in &episodes {
            assert_eq!(record.watched_at, Some(ts(10, record.episode)));
        }
    }

    #[tokio::test]
    async fn test_ratings_set_on_new_and_backfilled_on_existing() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(2, 20))));
        source.movies.push(movie_item(2, "Ronin", Some(ts(3, 20))));
        source.ratings.push({
            let mut r = movie_item(1, "Heat", None);
            r.source_rating = Some(10);
            r
        });
        source.ratings.push({
            let mut r = movie_item(2, "Ronin", None);
            r.source_rating = Some(7);
            r
        });

        let t = engine_with(source, MockMetadata::default());
        // Movie 1 already has a locally chosen rating; the import must not
        // overwrite it
        seed_movie(&t.store, 1, Some(3)).await;

        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        let movies = t.store.movies_snapshot();
        let heat = movies.iter().find(|m| m.movie.source_id == 1).unwrap();
        let ronin = movies.iter().find(|m| m.movie.source_id == 2).unwrap();
        assert_eq!(heat.movie.rating, Some(3));
        assert_eq!(ronin.movie.rating, Some(4)); // ceil(7 / 2)
    }

    #[tokio::test]
    async fn test_failed_item_is_recorded_and_run_continues() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(2, 20))));
        // A series whose metadata lookup fails poisons only its own item
        source.shows.push(series_record(10, "Broken", vec![episode(1, 1, Some(ts(3, 20)))]));
        source.movies.push(movie_item(2, "Ronin", Some(ts(4, 20))));

        struct FailingSeries(MockMetadata);

        #[async_trait::async_trait]
        impl library_sync_sources::MetadataClient for FailingSeries {
            async fn get_movie_details(
                &self,
                source_id: u64,
            ) -> Result<library_sync_models::MovieDetails, library_sync_sources::SourceError>
            {
                self.0.get_movie_details(source_id).await
            }

            async fn get_series_details(
                &self,
                _source_id: u64,
            ) -> Result<library_sync_models::SeriesDetails, library_sync_sources::SourceError>
            {
                Err(library_sync_sources::SourceError::other("metadata down"))
            }

            async fn get_season_details(
                &self,
                source_id: u64,
                season: u32,
            ) -> Result<library_sync_models::SeasonDetails, library_sync_sources::SourceError>
            {
                self.0.get_season_details(source_id, season).await
            }
        }

        let store = std::sync::Arc::new(crate::store::JsonLibraryStore::in_memory());
        let engine = crate::engine::SyncEngine::new(
            std::sync::Arc::new(source),
            std::sync::Arc::new(FailingSeries(MockMetadata::default())),
            store.clone(),
            library_sync_config::SyncTuning::default(),
            false,
        );

        engine.start_import(Default::default()).unwrap();
        engine.join_import().await;

        let state = engine.import_status();
        assert_eq!(state.completed, 3);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("Broken"));
        assert_eq!(store.stats().await.unwrap().movies, 2);
        assert_eq!(store.stats().await.unwrap().series, 0);
    }

    #[tokio::test]
    async fn test_start_import_rejected_while_running() {
        let t = engine_with(MockSource::default(), MockMetadata::default());
        t.engine.jobs.try_start().unwrap();
        assert!(matches!(
            t.engine.start_import(Default::default()),
            Err(SyncError::AlreadyRunning)
        ));
        // The claimed slot is untouched by the rejected start
        assert!(t.engine.import_status().in_progress);
    }
}
