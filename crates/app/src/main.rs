mod bootstrap;
mod cors;
mod envelope;
mod imagery;
mod router;
mod telemetry;

use std::net::SocketAddr;

use ee_gateway_util::{load_env_file, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let engine = bootstrap::initialize_engine().await;
    info!(
        stage = "app",
        earth_engine_ready = engine.is_ready(),
        "gateway bootstrap complete"
    );

    let state = router::AppState::new(metrics, engine);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
