use chrono::{DateTime, Utc};
use library_sync_models::SyncReport;
use tracing::{info, warn};

use crate::dedup::dedupe_by_source_id;
use crate::engine::SyncEngine;
use crate::error::SyncError;
use crate::import::{item_error, EpisodeMode};

impl SyncEngine {
    /// Pull everything the service recorded since the last known local
    /// watch, re-using the full importer's per-item logic in simple mode.
    /// The cursor is pulled back by the configured overlap so second-level
    /// clock skew between the service and local storage can never hide a
    /// watch; the existence guard absorbs the re-fetched overlap.
    ///
    /// Precondition: the library has at least one watch date, i.e. a full
    /// import ran before. Without one this is a documented no-op, not an
    /// error.
    pub async fn incremental_sync(&self) -> Result<SyncReport, SyncError> {
        if !self.source.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }

        let Some(latest) = self.store.latest_watch_date().await? else {
            info!("No local watch history yet, incremental sync skipped (run a full import first)");
            return Ok(SyncReport::default());
        };

        let cursor = latest - self.tuning.cursor_overlap();
        self.sync_from_date(cursor).await
    }

    /// Manual gap-filling: same reconciliation as `incremental_sync`, but
    /// from a caller-chosen date.
    pub async fn resync_since(&self, since: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        if !self.source.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        self.sync_from_date(since).await
    }

    /// Three independent reconciliation passes: movies, series episodes,
    /// watchlist. A pass dies only when its initial fetch fails; the other
    /// passes still run. Per-item failures are collected, never raised.
    async fn sync_from_date(&self, cursor: DateTime<Utc>) -> Result<SyncReport, SyncError> {
        info!(%cursor, "Starting incremental sync");
        let mut report = SyncReport::default();

        match self.source.get_watched_movies(Some(cursor)).await {
            Ok(items) => {
                for item in dedupe_by_source_id(items) {
                    match self.import_movie_item(&item).await {
                        Ok(true) => report.new_movie_watches += 1,
                        Ok(false) => {}
                        Err(e) => report.errors.push(item_error("movie", &item.title, &e)),
                    }
                }
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to fetch watched movies: {}", e));
            }
        }

        match self.source.get_watched_shows(Some(cursor)).await {
            Ok(records) => {
                for record in dedupe_by_source_id(records) {
                    // Incremental batches are assumed not to be binge-sized;
                    // if one is, it is written verbatim by design
                    match self.import_series_item(&record, EpisodeMode::Simple).await {
                        Ok(new_watches) => report.new_episode_watches += new_watches,
                        Err(e) => report.errors.push(item_error("series", &record.title, &e)),
                    }
                }
            }
            Err(e) => {
                report
                    .errors
                    .push(format!("failed to fetch watched shows: {}", e));
            }
        }

        match self.source.get_watchlist().await {
            Ok(items) => {
                for item in dedupe_by_source_id(items) {
                    match self.import_watchlist_item(&item).await {
                        Ok(true) => report.updated_watchlist_items += 1,
                        Ok(false) => {}
                        Err(e) => {
                            report
                                .errors
                                .push(item_error("watchlist item", &item.title, &e));
                        }
                    }
                }
            }
            Err(e) => {
                report.errors.push(format!("failed to fetch watchlist: {}", e));
            }
        }

        if let Err(e) = self.source.update_last_sync_time(Utc::now()).await {
            warn!("Failed to record last sync time: {}", e);
            report
                .errors
                .push(format!("failed to record last sync time: {}", e));
        }

        info!(
            new_movie_watches = report.new_movie_watches,
            new_episode_watches = report.new_episode_watches,
            updated_watchlist_items = report.updated_watchlist_items,
            errors = report.errors.len(),
            "Incremental sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::SyncError;
    use crate::store::LibraryStore;
    use crate::testutil::*;
    use library_sync_models::MediaKind;

    #[tokio::test]
    async fn test_sync_without_local_history_is_a_noop() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(2, 20))));

        let t = engine_with(source, MockMetadata::default());
        let report = t.engine.incremental_sync().await.unwrap();
        assert!(report.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(t.store.stats().await.unwrap().movies, 0);
    }

    #[tokio::test]
    async fn test_sync_requires_authentication() {
        let mut source = MockSource::default();
        source.authenticated = false;

        let t = engine_with(source, MockMetadata::default());
        assert!(matches!(
            t.engine.incremental_sync().await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_repeated_sync_is_idempotent() {
        // First engine performs the initial full import
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(1, 20))));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        // Later visit: the service has one new movie watch and one new
        // episode on top of the already imported history
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(1, 20))));
        source.movies.push(movie_item(2, "Ronin", Some(ts(9, 21))));
        source.shows.push(series_record(
            10,
            "Severance",
            vec![episode(1, 1, Some(ts(9, 22)))],
        ));
        let t2 = engine_with_store(source, MockMetadata::default(), t.store.clone());

        let first = t2.engine.incremental_sync().await.unwrap();
        assert_eq!(first.new_movie_watches, 1);
        assert_eq!(first.new_episode_watches, 1);
        assert!(first.errors.is_empty());

        let stats_after_first = t2.store.stats().await.unwrap();

        // No new data on the service: the second sync changes nothing
        let second = t2.engine.incremental_sync().await.unwrap();
        assert!(second.is_empty(), "second sync report: {:?}", second);
        assert!(second.errors.is_empty());

        let stats_after_second = t2.store.stats().await.unwrap();
        assert_eq!(stats_after_first.movies, stats_after_second.movies);
        assert_eq!(
            stats_after_first.watch_sessions,
            stats_after_second.watch_sessions
        );
        assert_eq!(
            stats_after_first.episode_watches,
            stats_after_second.episode_watches
        );
    }

    #[tokio::test]
    async fn test_cursor_overlap_catches_skewed_timestamps() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(5, 12))));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        // A watch stamped 30 minutes BEFORE the latest known local watch:
        // inside the one-hour overlap window, so the sync still sees it
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(5, 12))));
        source.movies.push(movie_item(2, "Ronin", Some(ts(5, 11) + chrono::Duration::minutes(30))));
        let t2 = engine_with_store(source, MockMetadata::default(), t.store.clone());

        let report = t2.engine.incremental_sync().await.unwrap();
        assert_eq!(report.new_movie_watches, 1);
        assert_eq!(t2.store.stats().await.unwrap().movies, 2);
    }

    #[tokio::test]
    async fn test_failed_pass_does_not_stop_other_passes() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(1, 20))));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        let mut source = MockSource::default();
        source.fail_movies = true;
        source.shows.push(series_record(
            10,
            "Severance",
            vec![episode(1, 1, Some(ts(9, 20)))],
        ));
        source
            .watchlist
            .push(watchlist_item(20, "Ronin", MediaKind::Movie));
        let t2 = engine_with_store(source, MockMetadata::default(), t.store.clone());

        let report = t2.engine.incremental_sync().await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("watched movies"));
        assert_eq!(report.new_episode_watches, 1);
        assert_eq!(report.updated_watchlist_items, 1);
    }

    #[tokio::test]
    async fn test_watchlist_items_added_without_sessions() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(1, 20))));
        source
            .watchlist
            .push(watchlist_item(20, "Ronin", MediaKind::Movie));
        source
            .watchlist
            .push(watchlist_item(30, "Severance", MediaKind::Series));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        let stats = t.store.stats().await.unwrap();
        assert_eq!(stats.movies, 2);
        assert_eq!(stats.series, 1);
        // Only the watched movie has a session
        assert_eq!(stats.watch_sessions, 1);
    }

    #[tokio::test]
    async fn test_sync_records_last_sync_time() {
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(1, 20))));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;
        assert!(t.engine.sync_status().last_sync_at.is_none());

        let report = t.engine.incremental_sync().await.unwrap();
        assert!(report.errors.is_empty());
        assert!(t.engine.sync_status().last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_resync_since_reaches_back_past_the_cursor() {
        // Library already has recent history; an old watch the incremental
        // window would miss is picked up by an explicit resync
        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(9, 20))));
        let t = engine_with(source, MockMetadata::default());
        t.engine.start_import(Default::default()).unwrap();
        t.engine.join_import().await;

        let mut source = MockSource::default();
        source.movies.push(movie_item(1, "Heat", Some(ts(9, 20))));
        source.movies.push(movie_item(2, "Ronin", Some(ts(2, 20))));
        let t2 = engine_with_store(source, MockMetadata::default(), t.store.clone());

        let incremental = t2.engine.incremental_sync().await.unwrap();
        assert_eq!(incremental.new_movie_watches, 0);

        let resync = t2.engine.resync_since(ts(1, 0)).await.unwrap();
        assert_eq!(resync.new_movie_watches, 1);
        assert_eq!(t2.store.stats().await.unwrap().movies, 2);
    }
}
