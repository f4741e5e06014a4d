//! API route handlers.

mod graph;
mod health;
mod index;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::types::ApiState;

/// Create the API router with all endpoints, relative to `/api`.
pub fn create_api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health::health_handler))
        // Graph endpoints
        .route("/graph", get(graph::graph_handler))
        .route("/graph/stats", get(graph::stats_handler))
        .route("/graph/vertices", get(graph::vertices_handler))
        .route("/graph/vertices/{id}", get(graph::vertex_handler))
        .route("/graph/edges", get(graph::edges_handler))
        .route("/graph/lookup/{label}/{name}", get(graph::lookup_handler))
        .with_state(state)
}

/// Create the viewer router: the HTML index at `/` and the API under `/api`.
pub fn create_viewer_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index::index_handler))
        .with_state(state.clone())
        .nest("/api", create_api_router(state))
        // Request tracing (enable with RUST_LOG=tower_http=info or higher)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}
