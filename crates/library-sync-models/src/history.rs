use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// One record from the tracking service: a watched movie or a watchlist
/// entry. Timestamps and ratings are optional because historical bulk
/// exports frequently lack them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub source_id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_rating: Option<u8>, // 1-10, the service's native scale
}

/// A watched series as reported by the tracking service, with every episode
/// watch the service knows about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedSeriesRecord {
    pub source_id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched_at: Option<DateTime<Utc>>,
    pub episodes: Vec<EpisodeWatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_rating: Option<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EpisodeWatch {
    pub season: u32,
    pub episode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
}
