use library_sync_models::{ImportOptions, ImportPreview, MediaKind, PreviewEntry};
use tracing::info;

use crate::dedup::dedupe_by_source_id;
use crate::engine::SyncEngine;
use crate::error::SyncError;

impl SyncEngine {
    /// Read-only diff of what a full import would touch: fetch the
    /// candidate lists, dedupe, classify against the library. Performs no
    /// writes. Unlike the import itself, any fetch failure aborts the whole
    /// preview; partial numbers would misrepresent the pending import.
    pub async fn build_preview(&self, options: ImportOptions) -> Result<ImportPreview, SyncError> {
        let (movies, shows, watchlist) = futures::try_join!(
            async {
                if !options.import_movies {
                    return Ok(Vec::new());
                }
                self.source
                    .get_watched_movies(None)
                    .await
                    .map_err(|source| SyncError::Fetch {
                        what: "watched movies",
                        source,
                    })
            },
            async {
                if !options.import_series {
                    return Ok(Vec::new());
                }
                self.source
                    .get_watched_shows(None)
                    .await
                    .map_err(|source| SyncError::Fetch {
                        what: "watched shows",
                        source,
                    })
            },
            async {
                if !options.import_watchlist {
                    return Ok(Vec::new());
                }
                self.source
                    .get_watchlist()
                    .await
                    .map_err(|source| SyncError::Fetch {
                        what: "watchlist",
                        source,
                    })
            },
        )?;

        let mut preview = ImportPreview::default();

        for item in dedupe_by_source_id(movies) {
            let in_library = self.guard.movie_id(item.source_id).await?.is_some();
            preview.movies.push(PreviewEntry {
                source_id: item.source_id,
                title: item.title,
                year: item.year,
                kind: MediaKind::Movie,
                in_library,
            });
        }

        for record in dedupe_by_source_id(shows) {
            let in_library = self.guard.series_id(record.source_id).await?.is_some();
            preview.series.push(PreviewEntry {
                source_id: record.source_id,
                title: record.title,
                year: record.year,
                kind: MediaKind::Series,
                in_library,
            });
        }

        for item in dedupe_by_source_id(watchlist) {
            let in_library = match item.kind {
                MediaKind::Movie => self.guard.movie_id(item.source_id).await?.is_some(),
                MediaKind::Series => self.guard.series_id(item.source_id).await?.is_some(),
            };
            preview.watchlist.push(PreviewEntry {
                source_id: item.source_id,
                title: item.title,
                year: item.year,
                kind: item.kind,
                in_library,
            });
        }

        info!(
            total = preview.total_items(),
            in_library = preview.already_in_library(),
            new = preview.new_items(),
            "Built import preview"
        );
        Ok(preview)
    }
}
