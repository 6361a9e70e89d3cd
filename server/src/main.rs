use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ephemera_server::config::{ServerConfig, StorageBackend};
use ephemera_server::db::pool::{create_pool, run_migrations};
use ephemera_server::engine::room_engine::RoomEngine;
use ephemera_server::store::{MemoryStore, RoomStore, SqliteStore};
use ephemera_server::web::app_state::AppState;
use ephemera_server::web::router::build_router;

/// How often idle rate-limit buckets are swept.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser, Debug)]
#[command(name = "ephemera-server", about = "Ephemeral chat room server")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "ephemera.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::load(&args.config)?;

    let store: Arc<dyn RoomStore> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory room store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Sqlite => {
            let pool = create_pool(&config.storage.database_url)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            Arc::new(SqliteStore::new(pool))
        }
    };

    let engine = RoomEngine::new(store).with_limits(config.engine_limits());
    let state = Arc::new(AppState::new(
        engine,
        Duration::from_secs(config.stream.heartbeat_secs),
    ));

    // No connection survives a restart, so anything still stored is orphaned.
    state
        .engine
        .purge_orphaned_rooms()
        .await
        .context("failed to purge orphaned rooms")?;

    let limiters = state.rate_limiters.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiters.cleanup(RATE_LIMIT_CLEANUP_INTERVAL);
        }
    });

    let app = build_router(state);

    let web_addr = config.server.web_address.as_str();
    info!("Ephemera server starting on {}", web_addr);

    let listener = tokio::net::TcpListener::bind(web_addr)
        .await
        .with_context(|| format!("failed to bind web listener on {web_addr}"))?;

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!(error = %e, "server error");
        return Err(e.into());
    }

    Ok(())
}
