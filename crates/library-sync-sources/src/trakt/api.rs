use chrono::{DateTime, NaiveDate, Utc};
use library_sync_models::{
    EpisodeDetails, EpisodeWatch, HistoryItem, MediaKind, MovieDetails, SeasonDetails,
    SeriesDetails, WatchedSeriesRecord,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::SourceError;

#[derive(Debug, Clone, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<u64>,
    pub tmdb: Option<u64>,
    pub imdb: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraktMovie {
    title: String,
    year: Option<u32>,
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct TraktShow {
    title: String,
    year: Option<u32>,
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct WatchedMovieRow {
    last_watched_at: Option<String>,
    movie: TraktMovie,
}

#[derive(Debug, Deserialize)]
struct WatchedShowRow {
    last_watched_at: Option<String>,
    show: TraktShow,
    #[serde(default)]
    seasons: Vec<WatchedSeasonRow>,
}

#[derive(Debug, Deserialize)]
struct WatchedSeasonRow {
    number: u32,
    #[serde(default)]
    episodes: Vec<WatchedEpisodeRow>,
}

#[derive(Debug, Deserialize)]
struct WatchedEpisodeRow {
    number: u32,
    last_watched_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchlistRow {
    #[serde(rename = "type")]
    item_type: String,
    movie: Option<TraktMovie>,
    show: Option<TraktShow>,
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    rating: u8,
    #[serde(rename = "type")]
    item_type: String,
    movie: Option<TraktMovie>,
    show: Option<TraktShow>,
}

#[derive(Debug, Deserialize)]
struct MovieSummary {
    title: String,
    year: Option<u32>,
    ids: TraktIds,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowSummary {
    title: String,
    year: Option<u32>,
    ids: TraktIds,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonEpisodeRow {
    season: u32,
    number: u32,
    title: Option<String>,
    first_aired: Option<String>,
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_air_date(raw: Option<&str>) -> Option<NaiveDate> {
    // first_aired is a full RFC 3339 timestamp; only the date part matters
    parse_timestamp(raw).map(|dt| dt.date_naive())
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    api_url: &str,
    path: &str,
    endpoint: &'static str,
    access_token: Option<&str>,
    client_id: &str,
) -> Result<T, SourceError> {
    let mut request = client
        .get(format!("{}{}", api_url, path))
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id);

    if let Some(token) = access_token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Api {
            endpoint,
            status,
            body,
        });
    }

    Ok(response.json().await?)
}

pub async fn get_watched_movies(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
) -> Result<Vec<HistoryItem>, SourceError> {
    let rows: Vec<WatchedMovieRow> = get_json(
        client,
        api_url,
        "/sync/watched/movies",
        "watched movies",
        Some(access_token),
        client_id,
    )
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(source_id) = row.movie.ids.trakt else {
            warn!("Skipping watched movie '{}' with no id", row.movie.title);
            continue;
        };
        items.push(HistoryItem {
            source_id,
            title: row.movie.title,
            year: row.movie.year,
            kind: MediaKind::Movie,
            watched_at: parse_timestamp(row.last_watched_at.as_deref()),
            source_rating: None,
        });
    }
    Ok(items)
}

pub async fn get_watched_shows(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
) -> Result<Vec<WatchedSeriesRecord>, SourceError> {
    let rows: Vec<WatchedShowRow> = get_json(
        client,
        api_url,
        "/sync/watched/shows",
        "watched shows",
        Some(access_token),
        client_id,
    )
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(source_id) = row.show.ids.trakt else {
            warn!("Skipping watched show '{}' with no id", row.show.title);
            continue;
        };
        let mut episodes = Vec::new();
        for season in &row.seasons {
            for episode in &season.episodes {
                episodes.push(EpisodeWatch {
                    season: season.number,
                    episode: episode.number,
                    watched_at: parse_timestamp(episode.last_watched_at.as_deref()),
                });
            }
        }
        records.push(WatchedSeriesRecord {
            source_id,
            title: row.show.title,
            year: row.show.year,
            last_watched_at: parse_timestamp(row.last_watched_at.as_deref()),
            episodes,
            source_rating: None,
        });
    }
    Ok(records)
}

pub async fn get_watchlist(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
) -> Result<Vec<HistoryItem>, SourceError> {
    let rows: Vec<WatchlistRow> = get_json(
        client,
        api_url,
        "/sync/watchlist?sort=added,asc",
        "watchlist",
        Some(access_token),
        client_id,
    )
    .await?;

    let mut items = Vec::new();
    for row in rows {
        let (title, year, ids, kind) = match row.item_type.as_str() {
            "movie" => match row.movie {
                Some(m) => (m.title, m.year, m.ids, MediaKind::Movie),
                None => continue,
            },
            "show" => match row.show {
                Some(s) => (s.title, s.year, s.ids, MediaKind::Series),
                None => continue,
            },
            // Season and episode watchlist entries are not importable as
            // library entries
            _ => continue,
        };
        let Some(source_id) = ids.trakt else {
            warn!("Skipping watchlist item '{}' with no id", title);
            continue;
        };
        items.push(HistoryItem {
            source_id,
            title,
            year,
            kind,
            watched_at: None,
            source_rating: None,
        });
    }
    Ok(items)
}

pub async fn get_ratings(
    client: &Client,
    api_url: &str,
    access_token: &str,
    client_id: &str,
) -> Result<Vec<HistoryItem>, SourceError> {
    let rows: Vec<RatingRow> = get_json(
        client,
        api_url,
        "/sync/ratings",
        "ratings",
        Some(access_token),
        client_id,
    )
    .await?;

    let mut items = Vec::new();
    for row in rows {
        let (title, year, ids, kind) = match row.item_type.as_str() {
            "movie" => match row.movie {
                Some(m) => (m.title, m.year, m.ids, MediaKind::Movie),
                None => continue,
            },
            "show" => match row.show {
                Some(s) => (s.title, s.year, s.ids, MediaKind::Series),
                None => continue,
            },
            _ => continue,
        };
        let Some(source_id) = ids.trakt else {
            continue;
        };
        items.push(HistoryItem {
            source_id,
            title,
            year,
            kind,
            watched_at: None,
            source_rating: Some(row.rating),
        });
    }
    Ok(items)
}

pub async fn get_movie_details(
    client: &Client,
    api_url: &str,
    client_id: &str,
    source_id: u64,
) -> Result<MovieDetails, SourceError> {
    let summary: MovieSummary = get_json(
        client,
        api_url,
        &format!("/movies/{}?extended=full", source_id),
        "movie details",
        None,
        client_id,
    )
    .await?;

    Ok(MovieDetails {
        source_id: summary.ids.trakt.unwrap_or(source_id),
        title: summary.title,
        year: summary.year,
        overview: summary.overview,
        poster_url: None,
    })
}

pub async fn get_series_details(
    client: &Client,
    api_url: &str,
    client_id: &str,
    source_id: u64,
) -> Result<SeriesDetails, SourceError> {
    let summary: ShowSummary = get_json(
        client,
        api_url,
        &format!("/shows/{}?extended=full", source_id),
        "series details",
        None,
        client_id,
    )
    .await?;

    Ok(SeriesDetails {
        source_id: summary.ids.trakt.unwrap_or(source_id),
        title: summary.title,
        year: summary.year,
        overview: summary.overview,
        poster_url: None,
    })
}

pub async fn get_season_details(
    client: &Client,
    api_url: &str,
    client_id: &str,
    source_id: u64,
    season: u32,
) -> Result<SeasonDetails, SourceError> {
    let rows: Vec<SeasonEpisodeRow> = get_json(
        client,
        api_url,
        &format!("/shows/{}/seasons/{}?extended=full", source_id, season),
        "season details",
        None,
        client_id,
    )
    .await?;

    let episodes = rows
        .into_iter()
        .map(|row| EpisodeDetails {
            season: row.season,
            episode: row.number,
            title: row.title,
            air_date: parse_air_date(row.first_aired.as_deref()),
        })
        .collect();

    Ok(SeasonDetails { season, episodes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Some("2024-03-10T21:15:00.000Z")).unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(parse_timestamp(Some("not a date")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn test_parse_air_date_keeps_date_part() {
        let date = parse_air_date(Some("2019-04-15T01:00:00.000Z")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 4, 15).unwrap());
    }

    #[test]
    fn test_watched_show_row_deserializes_nested_seasons() {
        let raw = r#"{
            "last_watched_at": "2024-01-02T03:04:05.000Z",
            "show": {"title": "Severance", "year": 2022, "ids": {"trakt": 140830, "tmdb": 95396, "imdb": "tt11280740", "slug": "severance"}},
            "seasons": [
                {"number": 1, "episodes": [
                    {"number": 1, "last_watched_at": "2024-01-01T20:00:00.000Z"},
                    {"number": 2, "last_watched_at": null}
                ]}
            ]
        }"#;
        let row: WatchedShowRow = serde_json::from_str(raw).unwrap();
        assert_eq!(row.show.ids.trakt, Some(140830));
        assert_eq!(row.seasons.len(), 1);
        assert_eq!(row.seasons[0].episodes.len(), 2);
        assert!(row.seasons[0].episodes[1].last_watched_at.is_none());
    }
}
