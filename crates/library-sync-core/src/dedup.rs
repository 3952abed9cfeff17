use library_sync_models::{HistoryItem, WatchedSeriesRecord};
use std::collections::HashSet;

pub trait HasSourceId {
    fn source_id(&self) -> u64;
}

impl HasSourceId for HistoryItem {
    fn source_id(&self) -> u64 {
        self.source_id
    }
}

impl HasSourceId for WatchedSeriesRecord {
    fn source_id(&self) -> u64 {
        self.source_id
    }
}

/// Drop repeated source ids, keeping the first occurrence. Order is stable;
/// the import loops rely on it only for reproducibility.
pub fn dedupe_by_source_id<T: HasSourceId>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.source_id()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_sync_models::MediaKind;

    fn item(source_id: u64, title: &str) -> HistoryItem {
        HistoryItem {
            source_id,
            title: title.to_string(),
            year: Some(2020),
            kind: MediaKind::Movie,
            watched_at: None,
            source_rating: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let items = vec![
            item(1, "Movie 1"),
            item(1, "Movie 1 Duplicate"),
            item(2, "Movie 2"),
            item(2, "Movie 2 Duplicate"),
        ];

        let deduped = dedupe_by_source_id(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title, "Movie 1");
        assert_eq!(deduped[1].title, "Movie 2");
    }

    #[test]
    fn test_dedupe_preserves_order() {
        let items = vec![item(3, "c"), item(1, "a"), item(2, "b"), item(1, "dup")];
        let deduped = dedupe_by_source_id(items);
        let ids: Vec<u64> = deduped.iter().map(|i| i.source_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_dedupe_empty_input() {
        let deduped = dedupe_by_source_id(Vec::<HistoryItem>::new());
        assert!(deduped.is_empty());
    }
}
