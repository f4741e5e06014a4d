//! Error types for the operations layer.

use std::fmt::Display;
use std::path::PathBuf;

use ansible_graph_core::GraphError;
use thiserror::Error;

use crate::requests::SourceKind;

/// Result type for operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors that can occur while loading and scraping sources.
#[derive(Debug, Error)]
pub enum OpsError {
    /// An inventory or playbook could not be read or parsed.
    #[error("Failed to load {kind} {path}: {message}")]
    SourceLoad {
        kind: SourceKind,
        path: PathBuf,
        message: String,
    },

    /// The graph store refused a write.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OpsError {
    /// Create a source load error for the given input.
    pub fn source_load(kind: SourceKind, path: impl Into<PathBuf>, message: impl Display) -> Self {
        Self::SourceLoad {
            kind,
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error must abort the whole scrape run rather than one input.
    pub fn is_fatal(&self) -> bool {
        match self {
            OpsError::Graph(err) => err.is_fatal(),
            _ => false,
        }
    }
}
