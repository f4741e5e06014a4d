//! Read-only HTTP viewer for the ansible-graph property graph.
//!
//! ## Endpoints
//!
//! - `GET /` - HTML listing of vertices and edges
//! - `GET /api/health` - Health check with vertex/edge counts
//! - `GET /api/graph` - Full graph snapshot
//! - `GET /api/graph/stats` - Vertex and edge counts per label
//! - `GET /api/graph/vertices?label=HOST` - Vertices, optionally filtered by label
//! - `GET /api/graph/vertices/{id}` - One vertex with its incident edges
//! - `GET /api/graph/edges?label=HAS-GROUP` - Edges, optionally filtered by label
//! - `GET /api/graph/lookup/{label}/{name}` - Vertex by label and name
//!
//! Every JSON body is wrapped as `{"data": ..., "timestamp": <ms>}`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ansible_graph_api::{create_api_state, create_viewer_router};
//! use ansible_graph_ops::{Config, OpsContext};
//!
//! let ctx = OpsContext::new(Config::default()).unwrap();
//! let state = create_api_state(ctx.graph());
//! let router = create_viewer_router(state);
//! ```

mod routes;
mod types;

pub use routes::{create_api_router, create_viewer_router};
pub use types::{ApiResponse, ApiState, ErrorResponse, HealthResponse, LabelQuery, VertexDetail};

use std::sync::Arc;

use ansible_graph_ops::SharedGraph;

/// Create a new API state reading from the given graph.
pub fn create_api_state(graph: SharedGraph) -> Arc<ApiState> {
    Arc::new(ApiState { graph })
}
