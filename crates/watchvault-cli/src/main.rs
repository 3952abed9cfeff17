use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, import, status, sync};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchvault")]
#[command(about = "WatchVault - track your library, import your watch history")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Write logs to this file instead of stderr (rotated daily)
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import your watch history from the tracking service
    #[command(long_about = "Build a preview of what would be imported, ask for confirmation, then run the full import in the background while showing progress. Use the category flags to restrict the import; with no flags everything is imported.")]
    Import {
        /// Import watched movies
        #[arg(long, action = ArgAction::SetTrue)]
        movies: bool,

        /// Import watched series
        #[arg(long, action = ArgAction::SetTrue)]
        series: bool,

        /// Import the watchlist
        #[arg(long, action = ArgAction::SetTrue)]
        watchlist: bool,

        /// Import ratings
        #[arg(long, action = ArgAction::SetTrue)]
        ratings: bool,

        /// Show the preview and exit without importing
        #[arg(long, action = ArgAction::SetTrue)]
        preview_only: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Pull watches recorded since the last sync
    #[command(long_about = "Incrementally sync new watches from the tracking service into the library. Requires a completed full import; use --since to re-fetch a wider window for manual gap filling.")]
    Sync {
        /// Resync from this date (RFC 3339 or YYYY-MM-DD) instead of the
        /// computed cursor
        #[arg(long, value_name = "DATE")]
        since: Option<String>,
    },
    /// Show authentication, sync and library status
    Status,
    /// Configure credentials and settings
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Clear stored credentials or sync bookkeeping
    Clear {
        /// Clear stored tracking-service tokens
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,

        /// Clear the recorded last sync time
        #[arg(long, action = ArgAction::SetTrue)]
        timestamps: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show,

    /// Configure the tracking service (OAuth application credentials)
    #[command(long_about = "Store the tracking service's API application credentials. Create an API application on the service first; the OAuth authorization itself runs on the next import or sync.")]
    Tracker {
        /// API application client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// API application client secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// Enable or disable automatic sync on startup
    AutoSync {
        #[arg(value_name = "on|off")]
        enabled: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Import {
            movies,
            series,
            watchlist,
            ratings,
            preview_only,
            yes,
        } => {
            import::run_import(movies, series, watchlist, ratings, preview_only, yes, &output).await
        }
        Commands::Sync { since } => sync::run_sync(since, &output).await,
        Commands::Status => status::run_status(&output).await,
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show);
            config::run_config(cmd, &output).await
        }
        Commands::Clear {
            credentials,
            timestamps,
        } => clear::run_clear(credentials, timestamps, &output),
    }
}
