//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod cache;
mod download;
mod fetch;
mod helpers;
mod index;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use filingacquire::config::{load_settings_with_options, LoadOptions};
use filingacquire::edgar::DEFAULT_FORM_TYPE;

#[derive(Parser)]
#[command(name = "filing")]
#[command(about = "Rate-limited EDGAR filing acquisition")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file and FILINGACQUIRE_DATA_DIR)
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a quarterly master index and list its entries
    Index {
        /// Calendar year, e.g. 2024
        year: i32,
        /// Quarter (1-4)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=4))]
        quarter: u32,
        /// Only show entries of this form type
        #[arg(long)]
        form: Option<String>,
        /// Only show entries for this CIK
        #[arg(long)]
        cik: Option<String>,
        /// Maximum entries to print (0 = unlimited)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Find a company's latest filings in the master indexes
    Filings {
        /// Company CIK (zero padding optional)
        cik: String,
        /// Years of indexes to search, and number of filings to return
        #[arg(short, long, default_value = "5")]
        years: u32,
        /// Form type
        #[arg(long, default_value = DEFAULT_FORM_TYPE)]
        form: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find and store a company's latest filings
    Download {
        /// Company CIK (zero padding optional)
        cik: String,
        /// Ticker used to name stored files
        #[arg(short, long)]
        ticker: String,
        /// Sector (top-level storage category)
        #[arg(short, long)]
        sector: String,
        /// Years of indexes to search, and number of filings to download
        #[arg(short, long, default_value = "5")]
        years: u32,
        /// Form type
        #[arg(long, default_value = DEFAULT_FORM_TYPE)]
        form: String,
    },

    /// List filings already stored for a company
    Stored {
        /// Sector (top-level storage category)
        sector: String,
        /// Ticker
        ticker: String,
    },

    /// Fetch a single archive URL through the rate limiter and retry policy
    Fetch {
        url: String,
        /// Write the body here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read or write the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Show resolved settings
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Print a cached value
    Get {
        namespace: String,
        entity: String,
        period: String,
    },
    /// Store a JSON value
    Set {
        namespace: String,
        entity: String,
        period: String,
        /// JSON document to store
        value: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let settings = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Index {
            year,
            quarter,
            form,
            cik,
            limit,
        } => index::cmd_index(&settings, year, quarter, form.as_deref(), cik.as_deref(), limit).await,
        Commands::Filings {
            cik,
            years,
            form,
            json,
        } => download::cmd_filings(&settings, &cik, years, &form, json).await,
        Commands::Download {
            cik,
            ticker,
            sector,
            years,
            form,
        } => download::cmd_download(&settings, &cik, &ticker, &sector, years, &form).await,
        Commands::Stored { sector, ticker } => download::cmd_stored(&settings, &sector, &ticker),
        Commands::Fetch { url, output } => fetch::cmd_fetch(&settings, &url, output.as_deref()).await,
        Commands::Cache { command } => match command {
            CacheCommands::Get {
                namespace,
                entity,
                period,
            } => cache::cmd_cache_get(&settings, &namespace, &entity, &period).await,
            CacheCommands::Set {
                namespace,
                entity,
                period,
                value,
            } => cache::cmd_cache_set(&settings, &namespace, &entity, &period, &value).await,
        },
        Commands::Status { json } => status::cmd_status(&settings, json),
    }
}
