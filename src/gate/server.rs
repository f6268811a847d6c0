//! Gateway HTTP server

use crate::gate::config::GatewayConfig;
use crate::gate::handlers::{self, GatewayState};
use anyhow::Context;
use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the gateway routes over `state`
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        // Profile management
        .route(
            "/api/config",
            post(handlers::create_config).get(handlers::list_configs),
        )
        .route(
            "/api/config/:id",
            put(handlers::update_config).delete(handlers::delete_config),
        )
        // Fan-out queries
        .route("/api/query", post(handlers::query))
        .route("/api/v2/query", post(handlers::query_tagged))
        // Utility endpoints
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(middleware::from_fn(logging_middleware))
}

/// Start the gateway server
pub async fn start_server(config: GatewayConfig) -> anyhow::Result<()> {
    let state = GatewayState::from_config(&config)?;
    info!(
        "Serving {} profile(s) from {}",
        state.store.len(),
        state.store.path().display()
    );

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid address {}:{}", config.host, config.port))?;

    info!("Starting Gateway on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Logging middleware
async fn logging_middleware(req: Request, next: Next) -> axum::response::Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    info!("{} {} {} {:?}", method, uri, status, duration);

    response
}
