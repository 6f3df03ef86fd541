//! slotswap — zero-downtime blue/green deploys on a single host.
//!
//! ```text
//! slotswap deploy                    build from [build] and deploy
//! slotswap deploy --image api:42     deploy an existing image
//! slotswap rollback                  return traffic to the previous slot
//! slotswap status --format json      persisted state vs. live routing
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "slotswap",
    about = "Blue/green deploys across two fixed slots behind a reverse proxy",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to slotswap.toml
    #[arg(short, long, global = true, default_value = "slotswap.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a new build in the standby slot and move traffic to it.
    ///
    /// Without --image the [build] section is used to build a fresh
    /// image tagged `<repository>:<unix seconds>`.
    Deploy {
        /// Deploy this image instead of building one.
        #[arg(long)]
        image: Option<String>,
    },
    /// Move traffic back to the previously active slot.
    Rollback,
    /// Show the active slot, rollback availability and live routing.
    Status {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so `status --format json` stays machine-readable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Deploy { image } => commands::deploy::run(&cli.config, image).await,
        Commands::Rollback => commands::rollback::run(&cli.config).await,
        Commands::Status { format } => commands::status::run(&cli.config, format).await,
    }
}
