//! EnzoWorks site service
//!
//! Entry point. Loads configuration, initialises structured logging and
//! either serves the site or runs a maintenance command.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use enzoworks::chat::ChatService;
use enzoworks::config::AppConfig;
use enzoworks::sandbox::feed::{FileSnapshotSource, HttpSnapshotSource, SnapshotSource};
use enzoworks::server::{self, routes::SiteState};
use enzoworks::storage;

const BANNER: &str = r#"
  ============================================
   E N Z O   W O R K S
   AI concierge relay + prediction sandbox
  ============================================
"#;

#[derive(Parser)]
#[command(name = "enzoworks", version, about = "EnzoWorks site service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml", env = "ENZOWORKS_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the chat relay and sandbox page (default)
    Serve,
    /// Drop settled records from the prediction history, keeping pending ones
    ResetStats {
        /// History file; defaults to `[history] path` from config
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let cfg = load_config(&cli.config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(cfg).await,
        Command::ResetStats { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&cfg.history.path));
            let report = storage::reset_stats(&path)?;
            println!("Stats reset.");
            println!("Removed records: {}", report.removed);
            println!("Remaining pending records: {}", report.remaining);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let path = path.to_str().context("Config path is not valid UTF-8")?;
        AppConfig::load(path)
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

async fn run_server(cfg: AppConfig) -> Result<()> {
    println!("{BANNER}");

    let chat = ChatService::from_config(&cfg.chat)?;

    let feed: Arc<dyn SnapshotSource> = match &cfg.feed.url {
        Some(url) => Arc::new(HttpSnapshotSource::new(
            url.clone(),
            cfg.feed.timeout_secs.map(std::time::Duration::from_secs),
        )?),
        None => Arc::new(FileSnapshotSource::new(&cfg.feed.path)),
    };

    info!(
        provider = %cfg.chat.provider,
        chat_ready = chat.is_configured(),
        feed = %feed.describe(),
        "EnzoWorks starting up"
    );

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                cfg.server.host, cfg.server.port
            )
        })?;

    let state = Arc::new(SiteState {
        chat: Arc::new(chat),
        feed,
        feed_path: PathBuf::from(&cfg.feed.path),
    });

    tokio::select! {
        res = server::serve(state, addr) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
            Ok(())
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("enzoworks=info"));

    let json_logging = std::env::var("ENZOWORKS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
