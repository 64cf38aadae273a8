//! fxlake CLI — run the daily exchange-rate pipeline for one logical date.
//!
//! Commands:
//! - `run` — fetch, normalize and write the partition for `--date`
//! - `path` — print the partition path `run` would write for `--date`
//!
//! Meant to be exec'd by an external scheduler once per calendar day.
//! Configuration comes from an optional TOML file and `FXLAKE_*` variables.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fxlake_core::{Config, Pipeline};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "fxlake.toml";

#[derive(Parser)]
#[command(
    name = "fxlake",
    version,
    about = "fxlake — daily exchange rates to partitioned Parquet"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./fxlake.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract → transform → load for one logical date.
    Run {
        /// Logical date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the partition path for a logical date without fetching or writing.
    Path {
        /// Logical date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { date } => run_pipeline(config, parse_date(date.as_deref())?),
        Commands::Path { date } => {
            let pipeline = Pipeline::from_config(config);
            println!("{}", pipeline.resolve_path(parse_date(date.as_deref())?));
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let file = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            Some(path.to_path_buf())
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    };

    let config = Config::load(file.as_deref()).context("failed to load configuration")?;
    info!(
        base_currency = %config.base_currency,
        output_root = %config.output_root,
        api_base = %config.api_base,
        max_attempts = config.retry.max_attempts,
        retry_delay_secs = config.retry.delay.as_secs(),
        "configuration loaded"
    );
    Ok(config)
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}

fn run_pipeline(config: Config, date: NaiveDate) -> Result<()> {
    let pipeline = Pipeline::from_config(config);

    match pipeline.run(date) {
        Ok(result) => {
            println!(
                "wrote {} rows ({} bytes) to {}",
                result.rows, result.bytes, result.path
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
