//! Lectern: passage retrieval for retrieval-augmented generation

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{HealthcheckOptions, DEFAULT_QUERIES};
use lectern::config::{Config, LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Diverse, relevance-ranked passage retrieval over an embedded corpus")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "lectern.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve passages for a query
    Search {
        /// Search query
        query: String,

        /// Number of passages (defaults to retrieval.default_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Metadata filter as JSON, e.g. '{"lang": "ro"}'
        #[arg(short, long = "where")]
        where_json: Option<String>,

        /// Output format (text, json, json-pretty)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check the corpus and run sample queries
    Healthcheck {
        /// How many unique titles to list
        #[arg(long, default_value = "30")]
        list: usize,

        /// Sample queries to run
        #[arg(long, num_args = 1..)]
        queries: Vec<String>,

        /// Passages per query
        #[arg(short, long, default_value = "6")]
        k: usize,

        /// Metadata filter as JSON; ignored with a warning when invalid
        #[arg(short, long = "where")]
        where_json: Option<String>,

        /// Exit with an error when any query returns nothing
        #[arg(long)]
        strict: bool,
    },

    /// Page through stored passages
    Inspect {
        /// Number of passages to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Passages to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Print full passage text instead of a preview
        #[arg(long)]
        full: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.level.raised(verbose);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so JSON search output on stdout stays clean
    match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let config = if config_found {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    init_logging(&config.logging, cli.verbose)?;
    if !config_found {
        debug!("No config at {}, using defaults", cli.config.display());
    }

    match cli.command {
        Commands::Search {
            query,
            top_k,
            where_json,
            format,
        } => commands::search_index(&config, &query, top_k, where_json.as_deref(), &format),
        Commands::Healthcheck {
            list,
            queries,
            k,
            where_json,
            strict,
        } => {
            let filter = commands::parse_where(where_json.as_deref()).unwrap_or_else(|e| {
                tracing::warn!("Ignoring --where: {:#}", e);
                None
            });
            let queries = if queries.is_empty() {
                DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
            } else {
                queries
            };
            let options = HealthcheckOptions {
                list_limit: list,
                queries,
                k,
                filter,
                strict,
            };
            commands::run_healthcheck(&config, &options)
        }
        Commands::Inspect {
            limit,
            offset,
            full,
        } => commands::inspect_store(&config, limit, offset, full),
        Commands::Init { path, force } => commands::init_config(&path, force).map(|_| ()),
    }
}
