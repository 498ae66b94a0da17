mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Result;
use maestro::engine::Engine;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = configuration::Settings::new()?;
    info!(
        primary = %settings.primary.provider_type(),
        secondary = ?settings.secondary.as_ref().map(|s| s.provider_type().to_string()),
        "configuration loaded"
    );
    let (server, engine_config) = settings.into_engine_config();
    let engine = Engine::from_config(engine_config)?;
    info!(
        providers = ?engine.provider_names(),
        tools = ?engine.tool_names(),
        chain_agents = ?engine.chain_agents(),
        "engine ready"
    );

    let app = routes::configure(state::AppState::new(engine)).layer(CorsLayer::permissive());

    let addr = server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
