//! Greenlight API server
//!
//! Reads `GREENLIGHT_*` settings from the environment, connects the movie
//! store and serves the JSON API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use greenlight_core::{build_server, AppState, Config, DatabasePool, SqlMovieStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "greenlight=info,greenlight_core=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    let dsn = config
        .db
        .dsn
        .clone()
        .context("GREENLIGHT_DB_DSN must be set")?;

    let db = DatabasePool::connect(&dsn, Some(config.db.max_open_conns))
        .await
        .context("failed to connect to the database")?;

    info!(
        environment = %config.environment,
        address = %config.server.address,
        backend = db.backend(),
        version = greenlight_core::VERSION,
        "starting server"
    );

    let state = AppState::new(config, SqlMovieStore::new(db.clone()));
    let server = build_server(&state).context("failed to build routes")?;
    let served = server.serve().await;

    db.close().await;
    served.context("server error")?;
    Ok(())
}
