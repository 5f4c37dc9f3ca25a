use axum::Router;
use loopsmith::config::Config;
use loopsmith::services::ors::OrsClient;
use loopsmith::services::route_engine::RouteEngine;
use loopsmith::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopsmith=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting loopsmith API server");

    // Initialize the routing provider client and engine
    let provider = if let Some(ref base_url) = config.ors_base_url {
        OrsClient::with_base_url(config.ors_api_key.clone(), base_url.clone())
    } else {
        OrsClient::new(config.ors_api_key.clone())
    };
    let engine = RouteEngine::new(Arc::new(provider), config.engine.clone());

    // Create application state
    let state = Arc::new(AppState { engine });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", loopsmith::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
