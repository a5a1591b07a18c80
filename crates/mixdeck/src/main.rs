//! mixdeck - per-application audio session CLI
//!
//! Subcommands:
//! - `mixdeck watch` - Stream session snapshots as JSON lines until Ctrl-C
//! - `mixdeck list` - Print the current sessions
//! - `mixdeck set-volume <id> <percent>` - Set one session's volume
//! - `mixdeck set-mute <id> <true|false>` - Mute or unmute one session
//! - `mixdeck master [percent]` - Print or set the master volume
//! - `mixdeck backend` - Show the detected audio backend
//! - `mixdeck config` - Show the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use deckconf::DeckConfig;
use mixdeck::{get_manager, spawn_json_lines_writer};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mixdeck")]
#[command(about = "Per-application audio session control")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./mixdeck.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream sessions-updated events as JSON lines on stdout
    Watch,

    /// Print the current sessions as JSON
    List,

    /// Set the volume of one session
    SetVolume {
        /// Session id as shown by `list`
        id: String,

        /// Percentage, clamped to 0-100
        #[arg(allow_negative_numbers = true)]
        percent: i64,
    },

    /// Mute or unmute one session
    SetMute {
        /// Session id as shown by `list`
        id: String,

        /// true to mute, false to unmute
        #[arg(action = ArgAction::Set)]
        muted: bool,
    },

    /// Print the master volume, or set it when a percentage is given
    Master {
        /// Percentage, clamped to 0-100
        #[arg(allow_negative_numbers = true)]
        percent: Option<i64>,
    },

    /// Show the detected audio backend
    Backend {
        /// Run detection again before reporting
        #[arg(long)]
        redetect: bool,
    },

    /// Show the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = DeckConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // stdout carries data, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml());
        for file in &sources.files {
            eprintln!("loaded: {}", file.display());
        }
        for var in &sources.env_overrides {
            eprintln!("env override: {}", var);
        }
        return Ok(());
    }

    let manager = get_manager(&config)
        .await
        .context("Failed to start session manager")?;

    let result = match cli.command {
        Commands::Watch => {
            let (sink, writer) = spawn_json_lines_writer(std::io::stdout());
            manager.register_sink(Arc::new(sink)).await;
            if !manager.start_monitoring().await {
                manager.cleanup().await;
                bail!("No audio backend available");
            }

            let interrupted = tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C");
            info!("Shutting down");

            // cleanup drops the sink, which lets the writer drain and exit
            manager.cleanup().await;
            if let Err(e) = writer.await {
                warn!("Session event writer failed: {}", e);
            }
            interrupted
        }
        Commands::List => {
            let sessions = manager.get_all_sessions().await;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
            Ok(())
        }
        Commands::SetVolume { id, percent } => {
            if manager.set_volume(&id, percent).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("Failed to set volume of session {}", id))
            }
        }
        Commands::SetMute { id, muted } => {
            if manager.set_mute(&id, muted).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("Failed to set mute of session {}", id))
            }
        }
        Commands::Master { percent: None } => {
            println!("{}", manager.get_master_volume().await);
            Ok(())
        }
        Commands::Master {
            percent: Some(percent),
        } => {
            if manager.set_master_volume(percent).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("Failed to set master volume"))
            }
        }
        Commands::Backend { redetect } => {
            let kind = if redetect {
                manager.redetect().await
            } else {
                manager.backend_kind().await
            };
            let availability = if kind.is_known() {
                "available"
            } else {
                "unavailable"
            };
            println!("{} ({})", kind, availability);
            Ok(())
        }
        Commands::Config => Ok(()),
    };

    manager.cleanup().await;
    result
}
