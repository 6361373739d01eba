use std::sync::Arc;

use dotenv::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use review_insight::api::{self, ApiDoc, AppState};
use review_insight::config::Config;
use review_insight::crawler::source_from_config;
use review_insight::pipeline::{Analyzer, AnalyzerSettings};
use review_insight::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(telemetry::env_filter()).init();

    let config = Config::from_env()?;
    info!(backend = ?config.backend, max_pages = config.max_pages, "loaded configuration");

    let analyzer = Analyzer::new(source_from_config(&config), AnalyzerSettings::from(&config));
    let state = Arc::new(AppState { analyzer });

    let app = api::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
