use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::commands::build_engine;
use crate::output::{Output, OutputFormat};

pub async fn run_status(output: &Output) -> Result<()> {
    let engine = build_engine(false)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let sync_status = engine.sync_status();
    let job = engine.import_status();
    let stats = engine.library_stats().await?;

    if output.format() != OutputFormat::Human {
        output.json(&serde_json::json!({
            "sync": sync_status,
            "import_job": job,
            "library": stats,
        }));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.add_row([
        "Authenticated".to_string(),
        if sync_status.is_authenticated {
            "yes".to_string()
        } else {
            "no".to_string()
        },
    ]);
    table.add_row([
        "Last sync".to_string(),
        sync_status
            .last_sync_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    ]);
    table.add_row([
        "Auto-sync".to_string(),
        if sync_status.auto_sync_enabled {
            "enabled".to_string()
        } else {
            "disabled".to_string()
        },
    ]);
    table.add_row(["Movies".to_string(), stats.movies.to_string()]);
    table.add_row(["Series".to_string(), stats.series.to_string()]);
    table.add_row([
        "Watch sessions".to_string(),
        stats.watch_sessions.to_string(),
    ]);
    table.add_row([
        "Episode watches".to_string(),
        stats.episode_watches.to_string(),
    ]);
    output.println(table.to_string());

    if job.in_progress {
        output.println(format!(
            "Import running: {}/{} items{}",
            job.completed,
            job.total,
            job.current_item
                .as_deref()
                .map(|item| format!(" ({})", item))
                .unwrap_or_default()
        ));
    } else if job.total > 0 {
        output.println(format!(
            "Last import: {}/{} items, {} errors.",
            job.completed,
            job.total,
            job.errors.len()
        ));
    }

    Ok(())
}
