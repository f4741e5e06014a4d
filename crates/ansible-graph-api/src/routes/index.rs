//! Minimal HTML listing of the graph.

use std::sync::Arc;

use ansible_graph_core::{GraphStore, VertexId};
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::types::{ApiResponse, ApiState, ErrorResponse};

struct VertexRow {
    id: u64,
    label: String,
    name: String,
    attrs: String,
}

struct EdgeRow {
    tail: String,
    label: String,
    head: String,
}

/// Askama template for the index page.
#[derive(Template)]
#[template(path = "index.html", escape = "html")]
struct IndexTemplate {
    vertex_count: usize,
    edge_count: usize,
    vertices: Vec<VertexRow>,
    edges: Vec<EdgeRow>,
}

impl IndexTemplate {
    fn new(graph: &GraphStore) -> Self {
        let vertices = graph
            .vertices()
            .map(|vertex| VertexRow {
                id: vertex.id.0,
                label: vertex.label.clone(),
                name: vertex.name().unwrap_or_default().to_string(),
                attrs: serde_json::to_string(&vertex.attrs).unwrap_or_default(),
            })
            .collect();
        let edges = graph
            .snapshot()
            .edges
            .into_iter()
            .map(|edge| EdgeRow {
                tail: display_name(graph, edge.tail),
                label: edge.label,
                head: display_name(graph, edge.head),
            })
            .collect();

        Self {
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
            vertices,
            edges,
        }
    }
}

/// Handler for GET /
pub async fn index_handler(State(state): State<Arc<ApiState>>) -> Response {
    let page = {
        let graph = state.graph.read().await;
        IndexTemplate::new(&graph)
    };

    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render index page: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::new(ErrorResponse {
                    code: "RENDER_FAILED".to_string(),
                    message: e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn display_name(graph: &GraphStore, id: VertexId) -> String {
    match graph.vertex(id) {
        Some(vertex) => format!("{}({})", vertex.label, vertex.name().unwrap_or("?")),
        None => format!("#{}", id.0),
    }
}
