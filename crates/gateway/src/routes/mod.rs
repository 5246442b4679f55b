//! HTTP routes of the gateway.

mod handler;
mod types;

pub use handler::AppState;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handler::health))
        .route("/connectors", get(handler::connectors))
        .route("/amm/price", post(handler::price))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
