mod aggregate;
mod api;
mod calendar;
mod config;
mod db;
mod error;
mod fetcher;
mod identity;
mod types;
mod upstream;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::aggregate::PitStopResources;
use crate::api::routes::{router, ApiState};
use crate::calendar::CalendarService;
use crate::config::Config;
use crate::db::SqliteRaceStore;
use crate::error::Result;
use crate::upstream::{DhlClient, JolpicaClient, OpenF1Client, UpstreamClient};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Upstream providers ---
    let primary: Arc<dyn UpstreamClient> =
        Arc::new(JolpicaClient::new(&cfg.jolpica_api_url, cfg.request_timeout)?);
    let telemetry: Arc<dyn UpstreamClient> =
        Arc::new(OpenF1Client::new(&cfg.openf1_api_url, cfg.request_timeout)?);
    let dhl = DhlClient::new(&cfg.dhl_api_base, cfg.request_timeout)?;
    if !dhl.is_configured() {
        warn!("DHL_API_BASE not set, pit-stop boards will be empty");
    }
    let secondary: Arc<dyn UpstreamClient> = Arc::new(dhl);
    info!(
        primary = %cfg.jolpica_api_url,
        telemetry = %cfg.openf1_api_url,
        timeout_secs = cfg.request_timeout.as_secs(),
        fetch_concurrency = cfg.fetch_concurrency,
        "Upstream providers ready"
    );

    // --- Calendar with persisted fallback ---
    let calendar = Arc::new(CalendarService::new(
        Arc::clone(&primary),
        telemetry,
        Arc::new(SqliteRaceStore::new(pool.clone())),
        cfg.fetch_concurrency,
    ));

    // HTTP API server
    let api_state = ApiState {
        primary,
        secondary,
        calendar,
        pitstops: PitStopResources::from_config(&cfg),
        fetch_concurrency: cfg.fetch_concurrency,
        pitstop_concurrency: cfg.pitstop_concurrency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
