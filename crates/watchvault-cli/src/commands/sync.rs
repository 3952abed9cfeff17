use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use color_eyre::Result;
use library_sync_models::SyncReport;

use crate::commands::build_engine;
use crate::output::{Output, OutputFormat};

pub async fn run_sync(since: Option<String>, output: &Output) -> Result<()> {
    let engine = build_engine(true)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let result = match since {
        Some(raw) => {
            let since = parse_since(&raw)?;
            output.println(format!("Resyncing watch history since {}...", since));
            engine.resync_since(since).await
        }
        None => {
            output.println("Syncing new watches...");
            engine.incremental_sync().await
        }
    };

    match result {
        Ok(report) => show_report(&report, output),
        Err(e) => output.error(format!("Sync failed: {}", e)),
    }
    Ok(())
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        color_eyre::eyre::eyre!("Invalid date '{}': use RFC 3339 or YYYY-MM-DD", raw)
    })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn show_report(report: &SyncReport, output: &Output) {
    if output.format() != OutputFormat::Human {
        if let Ok(value) = serde_json::to_value(report) {
            output.json(&value);
        }
        return;
    }

    if report.is_empty() && report.errors.is_empty() {
        output.success("Already up to date.");
        return;
    }

    output.success(format!(
        "Sync finished: {} new movie watches, {} new episode watches, {} watchlist items added.",
        report.new_movie_watches, report.new_episode_watches, report.updated_watchlist_items
    ));

    if !report.errors.is_empty() {
        output.warn(format!("{} problems during sync:", report.errors.len()));
        for error in &report.errors {
            output.println(format!("  - {}", error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_since_accepts_rfc3339_and_plain_dates() {
        let ts = parse_since("2024-03-01T10:30:00Z").unwrap();
        assert_eq!(ts.date_naive().month(), 3);

        let midnight = parse_since("2024-03-01").unwrap();
        assert_eq!(midnight.time(), NaiveTime::MIN);

        assert!(parse_since("yesterday").is_err());
    }
}
