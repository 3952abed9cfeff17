use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a library entry in local storage.
pub type LocalId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMovie {
    pub source_id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    /// Local 1-5 scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// True for entries added from the watchlist, without a watch session.
    #[serde(default)]
    pub on_watchlist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSeries {
    pub source_id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default)]
    pub on_watchlist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieEntry {
    pub id: LocalId,
    #[serde(flatten)]
    pub movie: NewMovie,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesEntry {
    pub id: LocalId,
    #[serde(flatten)]
    pub series: NewSeries,
}

/// One watch of a movie. `watched_at` is None when the service reported a
/// watch without a usable timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WatchSession {
    pub movie_id: LocalId,
    pub watched_at: Option<DateTime<Utc>>,
}

/// Episode progress: at most one record per (series, season, episode).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub series_id: LocalId,
    pub season: u32,
    pub episode: u32,
    pub watched_at: Option<DateTime<Utc>>,
}
