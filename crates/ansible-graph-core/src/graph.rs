//! The in-memory property graph.
//!
//! `GraphStore` wraps a petgraph `StableDiGraph` and adds two indexes:
//! one enforcing per-label vertex uniqueness on a declared key attribute,
//! one enforcing uniqueness of `(tail, label, head)` edge triples. All
//! writes go through upsert operations so re-scraping the same source is
//! idempotent.

use std::collections::{BTreeMap, HashMap};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::attrs::{key_string, AttrMap, NestedValuePolicy};
use crate::error::{GraphError, GraphResult};

// =============================================================================
// Identifiers and records
// =============================================================================

/// Identifier for vertices within a `GraphStore`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u64);

/// Identifier for edges within a `GraphStore`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl VertexId {
    fn from_index(index: NodeIndex) -> Self {
        Self(index.index() as u64)
    }

    /// `None` when the id is outside petgraph's `u32` index space.
    fn index(self) -> Option<NodeIndex> {
        u32::try_from(self.0).ok().map(NodeIndex::from)
    }
}

impl EdgeId {
    fn from_index(index: EdgeIndex) -> Self {
        Self(index.index() as u64)
    }
}

/// A labeled vertex and its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique identifier for this vertex.
    pub id: VertexId,
    /// Vertex label, e.g. `HOST`.
    pub label: String,
    /// Attribute map.
    pub attrs: AttrMap,
}

impl Vertex {
    /// Look up a single attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// The `name` attribute, when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.attrs.get("name").and_then(Value::as_str)
    }
}

/// A labeled, directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// Originating vertex.
    pub tail: VertexId,
    /// Relationship label, e.g. `HAS-GROUP`.
    pub label: String,
    /// Destination vertex.
    pub head: VertexId,
}

/// Serializable copy of the whole graph.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All vertices, in creation order.
    pub vertices: Vec<Vertex>,
    /// All edges, in creation order.
    pub edges: Vec<Edge>,
}

/// Vertex and edge counts per label.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    /// Vertex count per vertex label.
    pub vertices: BTreeMap<String, usize>,
    /// Edge count per edge label.
    pub edges: BTreeMap<String, usize>,
}

// =============================================================================
// Graph store
// =============================================================================

/// In-memory directed property graph with per-label uniqueness constraints.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: StableDiGraph<Vertex, Edge>,
    policy: NestedValuePolicy,
    /// Label -> unique key attribute.
    constraints: BTreeMap<String, String>,
    /// (label, canonical key value) -> vertex.
    key_index: HashMap<(String, String), NodeIndex>,
    /// (tail, label, head) -> edge.
    edge_index: HashMap<(NodeIndex, String, NodeIndex), EdgeIndex>,
}

impl GraphStore {
    /// Creates an empty store that preserves nested attribute values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given nested value policy.
    pub fn with_policy(policy: NestedValuePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The nested value policy applied on every vertex write.
    pub fn policy(&self) -> NestedValuePolicy {
        self.policy
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Declare `attribute` as the unique key for vertices of `label`.
    ///
    /// Re-declaring the same key is a no-op. Existing vertices of the label
    /// must all carry distinct values for the attribute, and a label whose
    /// vertices are already indexed under a different key cannot be
    /// re-keyed. On error the previous constraints stay in force.
    pub fn declare_vertex_key(&mut self, label: &str, attribute: &str) -> GraphResult<()> {
        if let Some(existing) = self.constraints.get(label) {
            if existing == attribute {
                return Ok(());
            }
            if self.has_label(label) {
                return Err(GraphError::Configuration(format!(
                    "{} vertices are already keyed by '{}', cannot re-key by '{}'",
                    label, existing, attribute
                )));
            }
        }

        let mut index = HashMap::new();
        for node in self.graph.node_indices() {
            let vertex = &self.graph[node];
            if vertex.label != label {
                continue;
            }
            let value = vertex.attrs.get(attribute).ok_or_else(|| {
                GraphError::Configuration(format!(
                    "existing {} vertex {:?} has no '{}' attribute",
                    label, vertex.id, attribute
                ))
            })?;
            let key = (label.to_string(), key_string(value));
            if index.insert(key, node).is_some() {
                return Err(GraphError::Configuration(format!(
                    "existing {} vertices share {}={}",
                    label,
                    attribute,
                    key_string(value)
                )));
            }
        }

        self.key_index.retain(|(l, _), _| l != label);
        self.key_index.extend(index);
        self.constraints
            .insert(label.to_string(), attribute.to_string());
        debug!(label, attribute, "declared vertex key");
        Ok(())
    }

    /// The key attribute declared for a label, if any.
    pub fn key_attribute(&self, label: &str) -> Option<&str> {
        self.constraints.get(label).map(String::as_str)
    }

    fn has_label(&self, label: &str) -> bool {
        self.graph.node_weights().any(|v| v.label == label)
    }

    // =========================================================================
    // Upserts
    // =========================================================================

    /// Return the vertex of `label` identified by `key`, creating it if absent.
    ///
    /// For a constrained label the match is on the declared key attribute,
    /// which `key` must contain. For an unconstrained label a vertex matches
    /// when all `key` attributes are equal. An existing vertex has the
    /// combined attributes merged in, last write wins.
    pub fn get_or_create_vertex(
        &mut self,
        label: &str,
        key: AttrMap,
        extra: AttrMap,
    ) -> GraphResult<VertexId> {
        let mut attrs = extra;
        attrs.extend(key.clone());
        let attrs = self.policy.apply(attrs)?;

        let existing = match self.constraints.get(label) {
            Some(attribute) => {
                let value = attrs.get(attribute).ok_or_else(|| GraphError::MissingKey {
                    label: label.to_string(),
                    attribute: attribute.clone(),
                })?;
                self.key_index
                    .get(&(label.to_string(), key_string(value)))
                    .copied()
            }
            None => {
                let wanted = self.policy.apply(key)?;
                self.graph.node_indices().find(|&node| {
                    let vertex = &self.graph[node];
                    vertex.label == label
                        && wanted.iter().all(|(k, v)| vertex.attrs.get(k) == Some(v))
                })
            }
        };

        match existing {
            Some(node) => {
                self.graph[node].attrs.extend(attrs);
                Ok(VertexId::from_index(node))
            }
            None => Ok(self.insert_vertex(label, attrs)),
        }
    }

    /// Create a vertex without upsert semantics.
    ///
    /// Fails with [`GraphError::ConstraintViolation`] if a vertex with the
    /// same key already exists.
    pub fn add_vertex(&mut self, label: &str, attrs: AttrMap) -> GraphResult<VertexId> {
        let attrs = self.policy.apply(attrs)?;

        if let Some(attribute) = self.constraints.get(label) {
            let value = attrs.get(attribute).ok_or_else(|| GraphError::MissingKey {
                label: label.to_string(),
                attribute: attribute.clone(),
            })?;
            let key = key_string(value);
            if self.key_index.contains_key(&(label.to_string(), key.clone())) {
                return Err(GraphError::ConstraintViolation {
                    label: label.to_string(),
                    attribute: attribute.clone(),
                    value: key,
                });
            }
        }

        Ok(self.insert_vertex(label, attrs))
    }

    fn insert_vertex(&mut self, label: &str, attrs: AttrMap) -> VertexId {
        let key = self
            .constraints
            .get(label)
            .and_then(|attribute| attrs.get(attribute))
            .map(key_string);

        let node = self.graph.add_node(Vertex {
            id: VertexId::default(),
            label: label.to_string(),
            attrs,
        });
        let id = VertexId::from_index(node);
        self.graph[node].id = id;

        if let Some(key) = key {
            self.key_index.insert((label.to_string(), key), node);
        }

        debug!(label, id = id.0, "vertex created");
        id
    }

    /// Return the edge `(tail) -[label]-> (head)`, creating it if absent.
    pub fn get_or_create_edge(
        &mut self,
        tail: VertexId,
        label: &str,
        head: VertexId,
    ) -> GraphResult<EdgeId> {
        let tail_index = self.existing_index(tail)?;
        let head_index = self.existing_index(head)?;

        let key = (tail_index, label.to_string(), head_index);
        if let Some(&edge) = self.edge_index.get(&key) {
            return Ok(EdgeId::from_index(edge));
        }

        let edge = self.graph.add_edge(
            tail_index,
            head_index,
            Edge {
                id: EdgeId::default(),
                tail,
                label: label.to_string(),
                head,
            },
        );
        let id = EdgeId::from_index(edge);
        if let Some(weight) = self.graph.edge_weight_mut(edge) {
            weight.id = id;
        }
        self.edge_index.insert(key, edge);

        debug!(label, tail = tail.0, head = head.0, "edge created");
        Ok(id)
    }

    fn existing_index(&self, id: VertexId) -> GraphResult<NodeIndex> {
        id.index()
            .filter(|index| self.graph.contains_node(*index))
            .ok_or(GraphError::UnknownVertex(id))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.graph.node_weight(id.index()?)
    }

    /// Finds a vertex of a constrained label by its key value.
    pub fn find_vertex(&self, label: &str, key: &str) -> Option<&Vertex> {
        let node = self.key_index.get(&(label.to_string(), key.to_string()))?;
        self.graph.node_weight(*node)
    }

    /// Iterates over all vertices in creation order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    /// Iterates over the vertices carrying `label`.
    pub fn vertices_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Vertex> {
        self.vertices().filter(move |v| v.label == label)
    }

    /// Iterates over all edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Iterates over the edges carrying `label`.
    pub fn edges_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges().filter(move |e| e.label == label)
    }

    /// Edges leaving `id`, ordered by edge id.
    pub fn out_edges(&self, id: VertexId) -> Vec<&Edge> {
        self.directed_edges(id, Direction::Outgoing)
    }

    /// Edges arriving at `id`, ordered by edge id.
    pub fn in_edges(&self, id: VertexId) -> Vec<&Edge> {
        self.directed_edges(id, Direction::Incoming)
    }

    fn directed_edges(&self, id: VertexId, direction: Direction) -> Vec<&Edge> {
        let Some(index) = id.index().filter(|index| self.graph.contains_node(*index)) else {
            return Vec::new();
        };
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(index, direction)
            .map(|e| e.weight())
            .collect();
        edges.sort_by_key(|e| e.id);
        edges
    }

    /// Whether an edge `(tail) -[label]-> (head)` exists.
    pub fn has_edge(&self, tail: VertexId, label: &str, head: VertexId) -> bool {
        match (tail.index(), head.index()) {
            (Some(tail), Some(head)) => self.edge_index.contains_key(&(tail, label.to_string(), head)),
            _ => false,
        }
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Counts vertices and edges per label.
    pub fn label_counts(&self) -> LabelCounts {
        let mut counts = LabelCounts::default();
        for vertex in self.vertices() {
            *counts.vertices.entry(vertex.label.clone()).or_default() += 1;
        }
        for edge in self.edges() {
            *counts.edges.entry(edge.label.clone()).or_default() += 1;
        }
        counts
    }

    /// Copies the whole graph into a serializable snapshot.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut edges: Vec<Edge> = self.edges().cloned().collect();
        edges.sort_by_key(|e| e.id);
        GraphSnapshot {
            vertices: self.vertices().cloned().collect(),
            edges,
        }
    }
}
