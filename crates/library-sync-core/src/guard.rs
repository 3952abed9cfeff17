use chrono::NaiveDate;
use library_sync_models::LocalId;
use std::sync::Arc;

use crate::store::{LibraryStore, StoreError};

/// Existence checks consulted before every insert. The engine never writes
/// blind: a movie, series or session is only created after this guard says
/// it is absent.
#[derive(Clone)]
pub struct ExistenceGuard {
    store: Arc<dyn LibraryStore>,
}

impl ExistenceGuard {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    pub async fn movie_id(&self, source_id: u64) -> Result<Option<LocalId>, StoreError> {
        self.store.find_movie(source_id).await
    }

    pub async fn series_id(&self, source_id: u64) -> Result<Option<LocalId>, StoreError> {
        self.store.find_series(source_id).await
    }

    pub async fn session_exists_on(
        &self,
        movie_id: LocalId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.store.watch_session_exists_on(movie_id, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonLibraryStore;
    use chrono::{TimeZone, Utc};
    use library_sync_models::NewMovie;

    #[tokio::test]
    async fn test_guard_reflects_store_contents() {
        let store = Arc::new(JsonLibraryStore::in_memory());
        let guard = ExistenceGuard::new(store.clone());

        assert_eq!(guard.movie_id(5).await.unwrap(), None);

        let id = store
            .insert_movie(NewMovie {
                source_id: 5,
                title: "Heat".to_string(),
                year: Some(1995),
                poster_url: None,
                rating: None,
                on_watchlist: false,
            })
            .await
            .unwrap();

        assert_eq!(guard.movie_id(5).await.unwrap(), Some(id));
        assert_eq!(guard.series_id(5).await.unwrap(), None);

        let watched_at = Utc.with_ymd_and_hms(2024, 1, 2, 20, 0, 0).unwrap();
        store
            .insert_watch_session(id, Some(watched_at))
            .await
            .unwrap();
        assert!(guard
            .session_exists_on(id, watched_at.date_naive())
            .await
            .unwrap());
    }
}
