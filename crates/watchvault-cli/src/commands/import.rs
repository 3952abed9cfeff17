use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use indicatif::{ProgressBar, ProgressStyle};
use library_sync_models::{ImportOptions, ImportPreview};
use std::time::Duration;
use tracing::debug;

use crate::commands::build_engine;
use crate::output::{Output, OutputFormat};

pub async fn run_import(
    movies: bool,
    series: bool,
    watchlist: bool,
    ratings: bool,
    preview_only: bool,
    yes: bool,
    output: &Output,
) -> Result<()> {
    // No category flags means everything
    let options = if movies || series || watchlist || ratings {
        ImportOptions {
            import_movies: movies,
            import_series: series,
            import_watchlist: watchlist,
            import_ratings: ratings,
        }
    } else {
        ImportOptions::default()
    };

    let engine = build_engine(true)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    output.println("Building import preview...");
    let preview = match engine.build_preview(options).await {
        Ok(preview) => preview,
        Err(e) => {
            output.error(format!("Preview failed: {}", e));
            return Ok(());
        }
    };

    show_preview(&preview, output);

    if preview.new_items() == 0 && preview.already_in_library() == 0 {
        output.println("Nothing to import.");
        return Ok(());
    }

    if preview_only {
        return Ok(());
    }

    if !yes
        && !dialoguer::Confirm::new()
            .with_prompt(format!(
                "Import {} items ({} new)?",
                preview.total_items(),
                preview.new_items()
            ))
            .default(true)
            .interact()?
    {
        output.println("Import cancelled.");
        return Ok(());
    }

    if let Err(e) = engine.start_import(options) {
        output.error(format!("Could not start import: {}", e));
        return Ok(());
    }

    // Ctrl-C requests cooperative cancellation instead of killing the
    // process; the item in flight still completes
    let cancel_engine = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, requesting import cancellation");
            cancel_engine.cancel_import();
        }
    });

    let bar = if output.format() == OutputFormat::Human && !output.is_quiet() {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let state = loop {
        let state = engine.import_status();
        if let Some(bar) = &bar {
            bar.set_length(state.total as u64);
            bar.set_position(state.completed as u64);
            if let Some(item) = &state.current_item {
                bar.set_message(item.clone());
            }
        }
        if !state.in_progress {
            break state;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if state.cancellation_requested {
        output.warn(format!(
            "Import cancelled after {} of {} items. Progress already made is kept.",
            state.completed, state.total
        ));
    } else {
        output.success(format!(
            "Import finished: {} of {} items processed.",
            state.completed, state.total
        ));
    }

    if !state.errors.is_empty() {
        output.warn(format!("{} items failed:", state.errors.len()));
        for error in &state.errors {
            output.println(format!("  - {}", error));
        }
    }

    if output.format() != OutputFormat::Human {
        output.json(&serde_json::to_value(&state)?);
    }

    Ok(())
}

fn show_preview(preview: &ImportPreview, output: &Output) {
    if output.format() != OutputFormat::Human {
        if let Ok(value) = serde_json::to_value(preview) {
            output.json(&value);
        }
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["", "Total", "New", "In library"]);
    for (label, entries) in [
        ("Movies", &preview.movies),
        ("Series", &preview.series),
        ("Watchlist", &preview.watchlist),
    ] {
        let new = entries.iter().filter(|e| !e.in_library).count();
        table.add_row([
            label.to_string(),
            entries.len().to_string(),
            new.to_string(),
            (entries.len() - new).to_string(),
        ]);
    }
    output.println(table.to_string());
    output.println(format!(
        "{} items total, {} new, {} already in the library.",
        preview.total_items(),
        preview.new_items(),
        preview.already_in_library()
    ));
}
