mod commands;
mod ui;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "promock")]
#[command(about = "Serve synthetic Prometheus metrics learned from real snapshots", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Where snapshots and settings come from.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Directory holding snapshot files (overrides METRICS_DIR)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Config file (YAML, TOML, or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve generated metrics over HTTP
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Refresh interval, e.g. "30s" (overrides REFRESH_INTERVAL)
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Load snapshots once and print generated scrapes
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of scrapes to print
        #[arg(short = 'n', long, default_value_t = 1)]
        scrapes: usize,

        /// Simulated time between scrapes
        #[arg(short, long, default_value = "15s")]
        every: String,
    },

    /// Show the model learned for every series
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Parse snapshot files and report malformed lines
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    match cli.command {
        Commands::Serve {
            source,
            port,
            interval,
        } => {
            let mut config = commands::load_config(&source).await?;
            if let Some(port) = port {
                config.listen_port = port;
            }
            if let Some(interval) = interval {
                config.refresh_interval = humantime::parse_duration(&interval)?;
            }
            config.validate()?;
            commands::serve::execute(config).await?;
        }

        Commands::Render {
            source,
            scrapes,
            every,
        } => {
            let config = commands::load_config(&source).await?;
            let every = humantime::parse_duration(&every)?;
            commands::render::execute(config, scrapes, every).await?;
        }

        Commands::Inspect { source, format } => {
            let config = commands::load_config(&source).await?;
            commands::inspect::execute(config, format).await?;
        }

        Commands::Validate { source } => {
            let config = commands::load_config(&source).await?;
            commands::validate::execute(config).await?;
        }
    }

    Ok(())
}
