// Server module - Provides reusable HTTP server functionality

use axum::Router;
use axum::http::HeaderValue;
use std::net::{SocketAddr, TcpListener};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::infrastructure::AppState;
use crate::infrastructure::config::Config;

/// Build the API router around an existing state
pub fn build_router(state: AppState, config: &Config) -> Router {
    let api_router = api::api_router_with_state(state);

    let cors = if config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors_allowed_origins {
            match origin.parse::<HeaderValue>() {
                Ok(v) => origins.push(v),
                Err(e) => tracing::error!("Failed to parse CORS origin '{}': {}", origin, e),
            }
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Find an available port starting from the preferred port
pub fn find_available_port(preferred_port: u16) -> Option<u16> {
    // Try preferred port first
    if TcpListener::bind(("0.0.0.0", preferred_port)).is_ok() {
        return Some(preferred_port);
    }

    // Scan next 100 ports
    ((preferred_port.saturating_add(1))..(preferred_port.saturating_add(100)))
        .find(|&port| TcpListener::bind(("0.0.0.0", port)).is_ok())
}

/// Serve the API until the process stops
pub async fn serve(state: AppState, config: &Config) -> Result<(), String> {
    let port = find_available_port(config.port)
        .ok_or_else(|| format!("No available port near {}", config.port))?;
    if port != config.port {
        tracing::warn!(
            "Preferred port {} was not available, using port {} instead",
            config.port,
            port
        );
    }

    let app = build_router(state, config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Storekeep server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("HTTP server error: {}", e))
}
