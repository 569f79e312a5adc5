use anyhow::Result;
use clap::Parser;
use datastore::{InMemoryStore, ResumeCacheStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "resume-cache")]
#[command(version)]
#[command(about = "Resume-state cache and continue-watching service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "resume-cache.toml")]
    config: PathBuf,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Keep the cache in memory instead of on disk
    #[arg(long)]
    in_memory: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!(
        "server={level},control_service={level},datastore={level},continue_watching={level}",
        level = cli.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume cache v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config.display());

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if cli.in_memory {
        config.database.in_memory = true;
    }

    let store: Arc<dyn ResumeCacheStore> = if config.database.in_memory {
        info!("Using in-memory store; records will not survive a restart");
        Arc::new(InMemoryStore::new())
    } else {
        info!("Using database: {}", config.database.url);
        let max_connections = config.database.max_connections.unwrap_or(5);
        Arc::new(SqliteStore::connect(&config.database.url, max_connections).await?)
    };

    let app = control_service::create_router(store);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
