use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dealhub::auth::session;
use dealhub::config::{Cli, Config};
use dealhub::db;
use dealhub::deals::DealRepository;
use dealhub::routes;
use dealhub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    // Housekeeping left over from the last run
    let expired = DealRepository::new(pool.clone()).expire_past_due()?;
    let purged = session::purge_expired(&pool)?;
    tracing::info!("Expired {} deals, purged {} sessions", expired, purged);

    let state = AppState::new(pool, config.clone());
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("{} listening on http://{}", config.site.name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
