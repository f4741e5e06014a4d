//! Core graph types for ansible-graph.
//!
//! This crate owns the in-memory property graph that scraped inventories and
//! playbooks are materialized into. Vertices carry a label and an open
//! attribute map; edges carry a label. Per-label key constraints keep vertex
//! identity stable across repeated scrapes.
//!
//! ```
//! use ansible_graph_core::{attrs, AttrMap, GraphStore};
//!
//! let mut store = GraphStore::new();
//! store.declare_vertex_key("HOST", "name").unwrap();
//!
//! let a = store
//!     .get_or_create_vertex("HOST", attrs([("name", "web1")]), AttrMap::new())
//!     .unwrap();
//! let b = store
//!     .get_or_create_vertex("HOST", attrs([("name", "web1")]), attrs([("ip", "10.0.0.1")]))
//!     .unwrap();
//!
//! assert_eq!(a, b);
//! assert_eq!(store.vertex_count(), 1);
//! ```

mod attrs;
mod error;
mod graph;

pub use attrs::{attrs, AttrMap, NestedValuePolicy};
pub use error::{GraphError, GraphResult};
pub use graph::{Edge, EdgeId, GraphSnapshot, GraphStore, LabelCounts, Vertex, VertexId};
