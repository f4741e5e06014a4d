//! Graph data endpoints.

use std::sync::Arc;

use ansible_graph_core::{Edge, GraphSnapshot, LabelCounts, Vertex, VertexId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::types::{ApiResponse, ApiState, ErrorResponse, LabelQuery, VertexDetail};

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::new(ErrorResponse {
            code: "NOT_FOUND".to_string(),
            message,
        })),
    )
        .into_response()
}

/// Handler for GET /api/graph - returns the full graph.
pub async fn graph_handler(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<GraphSnapshot>> {
    let graph = state.graph.read().await;
    Json(ApiResponse::new(graph.snapshot()))
}

/// Handler for GET /api/graph/stats - returns per-label counts.
pub async fn stats_handler(State(state): State<Arc<ApiState>>) -> Json<ApiResponse<LabelCounts>> {
    let graph = state.graph.read().await;
    Json(ApiResponse::new(graph.label_counts()))
}

/// Handler for GET /api/graph/vertices
pub async fn vertices_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LabelQuery>,
) -> Json<ApiResponse<Vec<Vertex>>> {
    let graph = state.graph.read().await;
    let vertices = match query.label.as_deref() {
        Some(label) => graph.vertices_with_label(label).cloned().collect(),
        None => graph.vertices().cloned().collect(),
    };
    Json(ApiResponse::new(vertices))
}

/// Handler for GET /api/graph/vertices/{id}
pub async fn vertex_handler(State(state): State<Arc<ApiState>>, Path(id): Path<u64>) -> Response {
    let graph = state.graph.read().await;
    let id = VertexId(id);

    match graph.vertex(id) {
        Some(vertex) => {
            let detail = VertexDetail {
                vertex: vertex.clone(),
                outgoing: graph.out_edges(id).into_iter().cloned().collect(),
                incoming: graph.in_edges(id).into_iter().cloned().collect(),
            };
            Json(ApiResponse::new(detail)).into_response()
        }
        None => not_found(format!("vertex {} not found", id.0)),
    }
}

/// Handler for GET /api/graph/edges
pub async fn edges_handler(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LabelQuery>,
) -> Json<ApiResponse<Vec<Edge>>> {
    let graph = state.graph.read().await;
    let edges = match query.label.as_deref() {
        Some(label) => graph.edges_with_label(label).cloned().collect(),
        None => graph.edges().cloned().collect(),
    };
    Json(ApiResponse::new(edges))
}

/// Handler for GET /api/graph/lookup/{label}/{name}
pub async fn lookup_handler(
    State(state): State<Arc<ApiState>>,
    Path((label, name)): Path<(String, String)>,
) -> Response {
    let graph = state.graph.read().await;
    match graph.find_vertex(&label, &name) {
        Some(vertex) => Json(ApiResponse::new(vertex.clone())).into_response(),
        None => not_found(format!("{label} '{name}' not found")),
    }
}
