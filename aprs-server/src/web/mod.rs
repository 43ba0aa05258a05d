//! Web server: axum status API over the shared station context.
//!
//! Text endpoints mirror the classic daemon (`/mheard`, `/graph`,
//! `/status`); `/api/*` serves the same data as JSON.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use aprs_core::StationContext;

pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub station: Arc<StationContext>,
    /// Unix time the server started.
    pub started: f64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mheard", axum::routing::get(routes::mheard))
        .route("/graph", axum::routing::get(routes::graph))
        .route("/status", axum::routing::get(routes::status))
        .route("/api/heard", axum::routing::get(routes::api_heard))
        .route("/api/edges", axum::routing::get(routes::api_edges))
        .route("/api/status", axum::routing::get(routes::api_status))
        .with_state(state)
        .layer(cors)
}

/// Start the web server and run until the listener fails.
pub async fn serve(station: Arc<StationContext>, host: String, port: u16) -> std::io::Result<()> {
    let state = Arc::new(AppState {
        station,
        started: crate::capture::now(),
    });

    let app = build_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");
    axum::serve(listener, app).await
}
