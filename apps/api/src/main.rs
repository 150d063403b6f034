mod analysis;
mod annotation;
mod config;
mod errors;
mod ingest;
mod routes;
mod state;
mod suggestions;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::config::AnalyzerConfig;
use crate::analysis::Analyzer;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::suggestions::classifier::{HttpSuggestionClassifier, SuggestionClassifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Build the analysis engine (vocabularies compiled once, shared by all requests)
    let analyzer_config = AnalyzerConfig::load(config.analyzer_config.as_deref())?;
    let analyzer = Analyzer::new(analyzer_config).context("Invalid analyzer configuration")?;
    match &config.analyzer_config {
        Some(path) => info!("Analyzer configured from {}", path.display()),
        None => info!("Analyzer using built-in defaults"),
    }

    // Optional suggestion classifier
    let classifier: Option<Arc<dyn SuggestionClassifier>> = match &config.classifier_url {
        Some(url) => {
            let client = HttpSuggestionClassifier::new(url.clone())
                .context("Failed to build suggestion classifier client")?;
            info!(
                "Suggestion classifier enabled at {} (threshold {})",
                client.url(),
                config.classifier_threshold
            );
            Some(Arc::new(client))
        }
        None => {
            info!("Suggestion classifier disabled (CLASSIFIER_URL not set)");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        analyzer: Arc::new(analyzer),
        classifier,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
