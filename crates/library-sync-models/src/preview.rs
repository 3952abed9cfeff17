use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewEntry {
    pub source_id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub kind: MediaKind,
    pub in_library: bool,
}

/// Read-only diff of what a full import would touch. Counts are derived
/// from the item lists so the two can never disagree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportPreview {
    pub movies: Vec<PreviewEntry>,
    pub series: Vec<PreviewEntry>,
    pub watchlist: Vec<PreviewEntry>,
}

impl ImportPreview {
    fn all(&self) -> impl Iterator<Item = &PreviewEntry> + '_ {
        self.movies
            .iter()
            .chain(self.series.iter())
            .chain(self.watchlist.iter())
    }

    pub fn total_items(&self) -> usize {
        self.all().count()
    }

    pub fn already_in_library(&self) -> usize {
        self.all().filter(|e| e.in_library).count()
    }

    pub fn new_items(&self) -> usize {
        self.all().filter(|e| !e.in_library).count()
    }
}
