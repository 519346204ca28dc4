mod collect_cmd;
mod replay;
mod status_cmd;
mod watch_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagewatch_config::{config_dir, config_file_path, load_and_prepare};
use tracing::debug;

#[derive(Parser)]
#[command(name = "pagewatch")]
#[command(about = "PageWatch: page-view change detection and collection")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.pagewatch/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collector service
    Collect {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory for the dated CSV logs
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Replay a recorded NDJSON host-event stream through the client engine
    Watch {
        /// Recording to read; `-` or absent reads stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Collector endpoint used when the page names none
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Show collector health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dir = config_dir();
    let path = cli.config.unwrap_or_else(|| config_file_path(&dir));
    let config = load_and_prepare(&path).await?;

    let logging = config.logging();
    let log_dir = logging.dir.clone().unwrap_or_else(|| dir.join("logs"));
    pagewatch_logging::init_logger(&log_dir, logging.level())?;
    debug!(config = %path.display(), "Configuration loaded");

    match cli.command {
        Commands::Collect { port, log_dir } => collect_cmd::run(&config, port, log_dir).await?,
        Commands::Watch { input, endpoint } => watch_cmd::run(config, input, endpoint).await?,
        Commands::Status => status_cmd::run(&config).await?,
    }

    Ok(())
}
