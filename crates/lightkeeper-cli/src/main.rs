//! `keeper` -- CLI binary for lightkeeper.
//!
//! Provides the following subcommands:
//!
//! - `keeper serve` -- Run the HTTP API until Ctrl+C.
//! - `keeper sign` -- Print the signature headers for an upload body.
//! - `keeper upload` -- Sign and POST an upload body to a dashboard.
//! - `keeper config` -- Show the resolved configuration, secrets redacted.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// lightkeeper scan ingestion service.
#[derive(Parser)]
#[command(name = "keeper", about = "lightkeeper scan ingestion service", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(commands::serve::ServeArgs),

    /// Print X-Timestamp, X-Nonce and X-Signature for an upload body.
    Sign {
        /// Body file, or `-` for stdin.
        file: PathBuf,
    },

    /// Sign and upload a report body.
    Upload(commands::upload::UploadArgs),

    /// Show the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run(config, args).await?,
        Commands::Sign { file } => commands::sign::run(&config, &file).await?,
        Commands::Upload(args) => commands::upload::run(&config, args).await?,
        Commands::Config => commands::config_cmd::config_show(&config),
    }

    Ok(())
}
