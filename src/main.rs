use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use caremap::{
    CareMapConfig, MapState, RefreshOrchestrator, Sources, Viewport, telemetry, web,
};
use tracing::{info, warn};

/// Headroom on top of the Overpass server-side timeout
const CLIENT_TIMEOUT_MARGIN_SECONDS: u64 = 10;

fn config_path_from_args() -> Option<PathBuf> {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = CareMapConfig::load_from_path(config_path_from_args())?;
    let _telemetry = telemetry::init(&config.logging)?;
    info!("CareMap {} starting", caremap::VERSION);

    let client = reqwest::Client::builder()
        .user_agent(&config.services.user_agent)
        .timeout(Duration::from_secs(
            u64::from(config.search.query_timeout_seconds) + CLIENT_TIMEOUT_MARGIN_SECONDS,
        ))
        .build()
        .context("Failed to build HTTP client")?;

    let surface = MapState::new(Viewport {
        center: config.defaults.start()?,
        zoom: config.defaults.zoom,
    });
    let orchestrator = Arc::new(RefreshOrchestrator::new(
        Sources::from_config(&config, client),
        surface,
        config.defaults.clone(),
    ));

    let initial = orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = initial.initial_load().await {
            warn!("Initial load failed: {}", e);
        }
    });

    web::run(orchestrator, &config.server).await
}
