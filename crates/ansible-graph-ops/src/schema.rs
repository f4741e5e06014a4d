//! Vertex and edge labels of the Ansible graph.

use std::fmt;

use ansible_graph_core::{GraphResult, GraphStore, NestedValuePolicy};
use serde::{Deserialize, Serialize};

/// Attribute that identifies vertices of every label.
pub const KEY_ATTRIBUTE: &str = "name";

/// Host variable derived from group membership; never stored on vertices.
pub const GROUP_NAMES: &str = "group_names";

/// Vertex labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VertexLabel {
    /// An inventory host.
    Host,
    /// An inventory group.
    Group,
    /// A play from a playbook.
    Play,
    /// A task from a play.
    Task,
}

impl VertexLabel {
    /// All vertex labels.
    pub const ALL: [VertexLabel; 4] = [
        VertexLabel::Host,
        VertexLabel::Group,
        VertexLabel::Play,
        VertexLabel::Task,
    ];

    /// Label string stored on vertices.
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexLabel::Host => "HOST",
            VertexLabel::Group => "GROUP",
            VertexLabel::Play => "PLAY",
            VertexLabel::Task => "TASK",
        }
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeLabel {
    /// Host or group is a direct member of a group.
    #[serde(rename = "HAS-GROUP")]
    HasGroup,
    /// Parent group to child group.
    #[serde(rename = "HAS-CHILD-GROUP")]
    HasChildGroup,
    /// Play to task.
    #[serde(rename = "HAS-TASK")]
    HasTask,
}

impl EdgeLabel {
    /// Label string stored on edges.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::HasGroup => "HAS-GROUP",
            EdgeLabel::HasChildGroup => "HAS-CHILD-GROUP",
            EdgeLabel::HasTask => "HAS-TASK",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create an empty store with `name` declared as the key of every vertex label.
pub fn new_graph_store(policy: NestedValuePolicy) -> GraphResult<GraphStore> {
    let mut store = GraphStore::with_policy(policy);
    for label in VertexLabel::ALL {
        store.declare_vertex_key(label.as_str(), KEY_ATTRIBUTE)?;
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_graph_store_declares_all_labels() {
        let store = new_graph_store(NestedValuePolicy::Preserve).unwrap();
        for label in VertexLabel::ALL {
            assert_eq!(store.key_attribute(label.as_str()), Some(KEY_ATTRIBUTE));
        }
        assert_eq!(store.vertex_count(), 0);
    }

    #[test]
    fn test_edge_label_serializes_with_dashes() {
        let json = serde_json::to_string(&EdgeLabel::HasChildGroup).unwrap();
        assert_eq!(json, "\"HAS-CHILD-GROUP\"");
        assert_eq!(EdgeLabel::HasTask.to_string(), "HAS-TASK");
    }
}
