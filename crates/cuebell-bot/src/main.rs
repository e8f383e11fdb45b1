use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use cuebell_core::config::CuebellConfig;
use cuebell_core::Locale;
use cuebell_discord::{DiscordAdapter, DiscordSink};
use cuebell_events::EventStore;
use cuebell_notifier::{Notifier, NotifierSettings};
use cuebell_schedule::HttpScheduleSource;

/// Watches published event schedules and posts notices to Discord channels.
#[derive(Debug, Parser)]
#[command(name = "cuebell", version)]
struct Cli {
    /// Config file (default: $CUEBELL_CONFIG, then ~/.cuebell/cuebell.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cuebell=info,cuebell_notifier=info,serenity=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > CUEBELL_CONFIG env > ~/.cuebell/cuebell.toml
    let config_path = cli.config.or_else(|| std::env::var("CUEBELL_CONFIG").ok());
    let config = CuebellConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        CuebellConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let registry = Arc::new(EventStore::new(db)?);
    info!("event registry ready");

    let source = Arc::new(HttpScheduleSource::new(&config.schedule)?);
    let locale = Locale::load(config.locale.dir.as_deref().map(Path::new), &config.locale.lang);

    let adapter = DiscordAdapter::new(&config.discord)?;
    let sink = Arc::new(DiscordSink::new(adapter.http()));

    let notifier = Arc::new(Notifier::new(
        registry,
        source,
        sink,
        locale,
        NotifierSettings::from(&config.notifier),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let gateway = tokio::spawn(adapter.run(shutdown_rx.clone()));
    let dispatch = notifier.start_dispatch_loop(shutdown_rx.clone());
    let scan = notifier.start_scan_loop(shutdown_rx);
    info!("cuebell running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    for (name, handle) in [("scan", scan), ("dispatch", dispatch), ("gateway", gateway)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "task ended abnormally");
        }
    }
    info!("cuebell stopped");
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
