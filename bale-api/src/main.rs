use std::net::SocketAddr;

use anyhow::Context;
use bale_api::{app, worker, AppState, Runtime};
use bale_store::app_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bale_api=debug,bale_order=debug,bale_trust=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load config")?;
    tracing::info!("Starting Bale API on port {}", config.server.port);

    let Runtime { state, trust_worker } = AppState::from_config(&config).await?;

    let poll = tokio::time::Duration::from_millis(config.scheduler.poll_interval_ms);
    worker::spawn_workers(state.scheduler.clone(), trust_worker, poll, state.telemetry.clone());

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
