use anyhow::Context;
use solar_analysis::{AnalysisConfig, SolarPipeline};
use solar_backend::{create_app, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Rooftop Solar Backend Server");

    let config = AnalysisConfig::from_env().context("Failed to load configuration")?;
    let pipeline = SolarPipeline::from_config(&config)?;
    let app = create_app(AppState::new(pipeline, config.default_electricity_rate));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
