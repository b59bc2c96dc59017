//! Recallbox - Ephemeral Message Archive and Delete Recovery
//!
//! Command-line front end: replays recorded channel events through the
//! recall engine and inspects configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use recallbox::{channels::ChannelEvent, channels::ConsoleAdapter, RecallConfig, RecallEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Longest accepted event line (16 MiB)
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "recallbox")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Ephemeral message archive and delete recovery for chat bots")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RECALLBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "RECALLBOX_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines file of channel events through the engine
    Replay {
        /// Event file, or `-` for stdin
        file: PathBuf,

        /// Send every recovery notice to this identity
        #[arg(long)]
        forward_to: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    /// Run diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("recallbox={}", log_level).into());
    let (json_layer, text_layer) = if cli.json_logs {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    match cli.command {
        Commands::Replay { file, forward_to } => {
            let mut config = load_config(cli.config.as_deref())?;
            if forward_to.is_some() {
                config.recovery.forward_to = forward_to;
            }
            run_replay(config, &file).await?;
        }
        Commands::Config { default } => {
            let config = if default {
                RecallConfig::default()
            } else {
                load_config(cli.config.as_deref())?
            };
            show_config(&config)?;
        }
        Commands::Doctor => {
            run_doctor(cli.config.as_deref());
        }
    }

    Ok(())
}

/// Explicit path, else the default location if it exists, else defaults
fn load_config(path: Option<&Path>) -> Result<RecallConfig> {
    if let Some(path) = path {
        return RecallConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match RecallConfig::default_path() {
        Some(path) if path.exists() => RecallConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        _ => Ok(RecallConfig::default()),
    }
}

async fn run_replay(config: RecallConfig, file: &Path) -> Result<()> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if file == Path::new("-") {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(
            tokio::fs::File::open(file)
                .await
                .with_context(|| format!("failed to open {}", file.display()))?,
        )
    };

    let engine = RecallEngine::builder(Arc::new(ConsoleAdapter::new()))
        .config(config)
        .build()?;
    engine.start();

    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            next = lines.next() => match next {
                Some(line) => line.context("failed to read event line")?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping replay");
                break;
            }
        };
        line_no += 1;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match ChannelEvent::from_json(line) {
            Ok(event) => {
                for outcome in engine.handle_event(event).await {
                    tracing::debug!(line = line_no, outcome = ?outcome, "Recovery finished");
                }
            }
            Err(e) => {
                tracing::warn!(line = line_no, "Skipping malformed event: {}", e);
            }
        }
    }

    let stats = engine.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    engine.stop();

    Ok(())
}

fn show_config(config: &RecallConfig) -> Result<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

fn run_doctor(explicit: Option<&Path>) {
    println!("🔍 Recallbox Doctor");
    println!();

    println!("Checking configuration...");
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(RecallConfig::default_path);

    let config = match path {
        Some(path) if path.exists() => match RecallConfig::load(&path) {
            Ok(config) => {
                println!("  ✓ Configuration file valid: {}", path.display());
                config
            }
            Err(e) => {
                println!("  ✗ Configuration file invalid: {}: {}", path.display(), e);
                return;
            }
        },
        Some(path) => {
            println!(
                "  ℹ No configuration file at {} (using defaults)",
                path.display()
            );
            RecallConfig::default()
        }
        None => {
            println!("  ℹ No configuration directory on this platform (using defaults)");
            RecallConfig::default()
        }
    };

    println!();
    println!("Effective settings:");
    println!("  archive ttl:        {}s", config.archive.ttl_secs);
    println!("  sweep interval:     {}s", config.archive.sweep_interval_secs);
    println!("  capacity:           {} records", config.archive.capacity);
    println!("  recovery enabled:   {}", config.recovery.enabled);
    println!(
        "  forward to:         {}",
        config
            .recovery
            .forward_to
            .as_deref()
            .unwrap_or("(deletion chat)")
    );
    println!("  ignored chats:      {}", config.recovery.ignored_chats.join(", "));

    println!();
    println!("Doctor check complete!");
}
