//! Article harvester CLI
//!
//! Local execution entry point, suitable for a scheduled job.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::Config,
    pipeline::{self, LogEvents},
    services::HttpFetcher,
    storage,
};

/// Harvester - incremental article ingestion
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests new articles from a listing page into a remote table"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvester.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest new articles into the store (default)
    Run {
        /// Print records instead of writing them
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many listing pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Override the site base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Validate configuration and selectors
    Validate,
}

/// Initialize logging from config, verbosity flag and optional log file.
fn init_logging(level: &str, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = log_file {
        let file = File::options().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_exists = cli.config.exists();
    let mut config = if config_exists {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
    init_logging(&config.logging.level, cli.verbose, log_file.as_deref())?;

    log::info!("Harvester starting...");
    if config_exists {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::warn!("Config {} not found. Using defaults.", cli.config.display());
    }

    let command = cli.command.unwrap_or(Command::Run {
        dry_run: false,
        max_pages: None,
        base_url: None,
    });

    match command {
        Command::Run {
            dry_run,
            max_pages,
            base_url,
        } => {
            if let Some(base_url) = base_url {
                config.site.base_url = base_url;
            }
            if let Some(max_pages) = max_pages {
                config.crawler.max_pages = max_pages;
            }
            config.crawler.dry_run |= dry_run;

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let fetcher = HttpFetcher::from_config(&config.crawler)?;
            let store = storage::build_store(&config.store, &config.crawler)
                .inspect_err(|e| log::error!("Cannot open store: {}", e))?;

            let summary = pipeline::run_ingest(&config, &fetcher, store.as_ref(), &LogEvents).await?;

            if let Some(halt) = &summary.halt {
                log::debug!("Halted: {}", halt);
            }
            println!("Done. {summary}");
        }

        Command::Validate => {
            pipeline::run_validate(&config)?;
        }
    }

    Ok(())
}
