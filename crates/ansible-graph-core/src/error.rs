//! Error types for the graph store.

use thiserror::Error;

use crate::graph::VertexId;

/// Result type alias for graph store operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised by the graph store.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A key declaration conflicts with existing constraints or data.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two vertices of one label would share a key value.
    #[error("constraint violation: {label} vertex with {attribute}={value} already exists")]
    ConstraintViolation {
        label: String,
        attribute: String,
        value: String,
    },

    /// An upsert on a constrained label did not supply the key attribute.
    #[error("missing key attribute '{attribute}' for {label} vertex")]
    MissingKey { label: String, attribute: String },

    /// An attribute value was refused by the nested value policy.
    #[error("invalid attribute '{key}': {reason}")]
    InvalidAttribute { key: String, reason: String },

    /// An edge endpoint does not exist in this store.
    #[error("unknown vertex: {0:?}")]
    UnknownVertex(VertexId),
}

impl GraphError {
    /// Whether the error breaks a store invariant and must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GraphError::ConstraintViolation { .. })
    }
}
