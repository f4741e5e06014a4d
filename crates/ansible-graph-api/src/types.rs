//! API types and DTOs.

use std::time::{SystemTime, UNIX_EPOCH};

use ansible_graph_core::{Edge, Vertex};
use ansible_graph_ops::SharedGraph;
use serde::{Deserialize, Serialize};

/// Shared application state for the API.
pub struct ApiState {
    /// The scraped graph; handlers only take read locks.
    pub graph: SharedGraph,
}

/// Response wrapper with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    /// Create a new API response with current timestamp.
    pub fn new(data: T) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { data, timestamp }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Number of vertices in the graph.
    pub vertices: usize,
    /// Number of edges in the graph.
    pub edges: usize,
}

/// A vertex together with its incident edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexDetail {
    /// The vertex.
    pub vertex: Vertex,
    /// Edges leaving the vertex.
    pub outgoing: Vec<Edge>,
    /// Edges entering the vertex.
    pub incoming: Vec<Edge>,
}

/// Optional label filter for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LabelQuery {
    /// Only return elements with this label.
    #[serde(default)]
    pub label: Option<String>,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}
