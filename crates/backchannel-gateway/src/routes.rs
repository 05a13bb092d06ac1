//! Router configuration.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use backchannel_registry::ConnectionStore;

use crate::handlers::{health, invoke, stats, ws};
use crate::state::HubState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Hub
/// - `GET /hub/ws` - WebSocket connection (authenticated via the seam)
/// - `POST /hub/invoke` - Invoke a method on connected clients
/// - `GET /hub/stats` - Registry and correlator counters
/// - `GET /hub/connections` - Snapshot of connected users
pub fn create_router<S>(state: HubState<S>) -> Router
where
    S: ConnectionStore + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Hub
        .route("/hub/ws", get(ws::hub_socket::<S>))
        .route("/hub/invoke", post(invoke::invoke::<S>))
        .route("/hub/stats", get(stats::stats::<S>))
        .route("/hub/connections", get(stats::snapshot::<S>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
