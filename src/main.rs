//! # Price Watch CLI (`pricewatch`)
//!
//! ## Usage
//!
//! ```bash
//! pricewatch --config ./config/pricewatch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pricewatch init` | Create the SQLite database and schema |
//! | `pricewatch check [URL...]` | Fetch, classify and notify for each target |
//! | `pricewatch list` | Show all stored price records |
//! | `pricewatch get <URL>` | Show the stored record for one URL |
//! | `pricewatch sites` | List shops with a registered extraction rule |
//! | `pricewatch notify <TEXT>` | Send a test message through Telegram |
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use price_watch::check::{self, OutputFormat};
use price_watch::{config, migrate, notify, records, sites};

/// Price Watch — track product prices and get notified when they change.
#[derive(Parser)]
#[command(
    name = "pricewatch",
    about = "Price Watch — track product prices and get notified when they change",
    version,
    long_about = "Price Watch fetches product pages through rotating proxies, extracts the \
    current price with per-shop rules, compares it against the last recorded price in SQLite, \
    and sends a Telegram message when the price goes up or down."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pricewatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Check prices for the given URLs, or for `[targets].urls` when none are given.
    ///
    /// Individual target failures are reported in the output and do not
    /// make the command fail.
    Check {
        /// Target URLs.
        urls: Vec<String>,

        /// Output format: `table`, `csv`, or `json`.
        #[arg(long, default_value = "table")]
        format: OutputFormat,

        /// Override `fetch.max_attempts` for this run.
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// List all stored price records.
    List,

    /// Show the stored price record for one URL.
    Get {
        url: String,
    },

    /// List registered extraction rules and how many targets use each.
    Sites,

    /// Send a message through the configured Telegram bot.
    Notify {
        /// Message text (Telegram HTML markup allowed).
        text: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Check {
            urls,
            format,
            attempts,
        } => {
            check::run_check(&cfg, urls, format, attempts).await?;
        }
        Commands::List => {
            records::run_list(&cfg).await?;
        }
        Commands::Get { url } => {
            records::run_get(&cfg, &url).await?;
        }
        Commands::Sites => {
            sites::list_sites(&cfg)?;
        }
        Commands::Notify { text } => {
            notify::run_notify(&cfg, &text).await?;
        }
    }

    Ok(())
}
