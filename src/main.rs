use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freerooms::config::Config;
use freerooms::i18n;
use freerooms::service::RoomFinder;
use freerooms::upstream::UpstreamClient;

mod commands;

// Messages printed by the binary come from the same catalogs as the library's
rust_i18n::i18n!("locales", fallback = "en");

#[derive(Parser)]
#[command(
    name = "freerooms",
    version,
    about = "Find free classrooms in the MIET schedule",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML config file; FREEROOMS_* variables still apply on top
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List rooms free at a given day and pair
    Query {
        /// today, tomorrow, a weekday or a date (2026-10-14, 14.10.2026, 14.10)
        day: String,

        /// Time of day (HH:MM) or pair number
        slot: String,

        /// Page to show, starting from 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Only rooms starting with this prefix, e.g. a building number
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Re-fetch the list of study groups
    RefreshGroups,

    /// Rebuild the rooms catalog from every group's schedule
    RefreshRooms,

    /// Show the rooms catalog
    Rooms {
        /// Only rooms starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Show the bell schedule
    Pairs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(format, cli.verbose, &config.logging.level)?;
    i18n::init_from_env();

    let client = UpstreamClient::new(&config.upstream).context("Failed to build HTTP client")?;
    let finder = RoomFinder::new(Arc::new(client), &config)?;
    finder.load_state().await?;

    match cli.command {
        Commands::Query {
            day,
            slot,
            page,
            prefix,
        } => {
            tracing::info!(
                day = %day,
                slot = %slot,
                page = %page,
                prefix = ?prefix,
                "Starting query command"
            );
            commands::query(&finder, &day, &slot, page, prefix).await?;
        }

        Commands::RefreshGroups => {
            tracing::info!("Starting refresh-groups command");
            commands::refresh_groups(&finder).await?;
        }

        Commands::RefreshRooms => {
            tracing::info!("Starting refresh-rooms command");
            commands::refresh_rooms(&finder).await?;
        }

        Commands::Rooms { prefix } => {
            commands::rooms(&finder, prefix.as_deref()).await?;
        }

        Commands::Pairs => {
            commands::pairs(&finder);
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool, level: &str) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("freerooms=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("freerooms={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("freerooms=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
