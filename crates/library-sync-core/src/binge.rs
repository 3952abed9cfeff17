use chrono::{NaiveDate, NaiveTime};
use library_sync_models::EpisodeWatch;
use std::collections::{HashMap, HashSet};

/// A calendar date with MORE THAN this many watched episodes of one series
/// counts as a binge day. Bulk historical imports tend to stamp a whole
/// rewatched season with the date the user ran the import, so episodes on
/// such days get their air date instead. The cutoff is a documented policy
/// constant, not a tuning knob to adjust casually.
pub const BINGE_DAY_EPISODE_THRESHOLD: usize = 4;

/// Air dates for one series, keyed by (season, episode).
#[derive(Debug, Clone, Default)]
pub struct AirDateIndex {
    dates: HashMap<(u32, u32), NaiveDate>,
}

impl AirDateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, season: u32, episode: u32, air_date: NaiveDate) {
        self.dates.insert((season, episode), air_date);
    }

    pub fn get(&self, season: u32, episode: u32) -> Option<NaiveDate> {
        self.dates.get(&(season, episode)).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Calendar dates (UTC) on which more than `threshold` episodes were
/// watched. Episodes without a timestamp never contribute to a group.
pub fn binge_days(episodes: &[EpisodeWatch], threshold: usize) -> HashSet<NaiveDate> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for episode in episodes {
        if let Some(watched_at) = episode.watched_at {
            *per_day.entry(watched_at.date_naive()).or_insert(0) += 1;
        }
    }
    per_day
        .into_iter()
        .filter(|(_, count)| *count > threshold)
        .map(|(date, _)| date)
        .collect()
}

/// Substitute air dates for episodes on binge days. Episodes off binge days
/// keep their reported timestamp untouched, as do binge-day episodes the
/// index has no entry for. With no binge day at all the input comes back
/// unchanged.
pub fn apply_air_date_correction(
    episodes: Vec<EpisodeWatch>,
    index: &AirDateIndex,
    threshold: usize,
) -> Vec<EpisodeWatch> {
    let days = binge_days(&episodes, threshold);
    if days.is_empty() {
        return episodes;
    }

    episodes
        .into_iter()
        .map(|mut episode| {
            let Some(watched_at) = episode.watched_at else {
                return episode;
            };
            if !days.contains(&watched_at.date_naive()) {
                return episode;
            }
            if let Some(air_date) = index.get(episode.season, episode.episode) {
                episode.watched_at = Some(air_date.and_time(NaiveTime::MIN).and_utc());
            }
            episode
        })
        .collect()
}
