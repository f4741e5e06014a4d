//! Vertex attribute containers.
//!
//! Attributes come straight from configuration variables, so the key set is
//! open and values are heterogeneous. They are kept in an ordered map of
//! JSON values; how nested mappings and sequences are stored is decided by a
//! [`NestedValuePolicy`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, GraphResult};

/// Ordered attribute map attached to every vertex.
pub type AttrMap = BTreeMap<String, Value>;

/// How nested attribute values (mappings and sequences) are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedValuePolicy {
    /// Store nested values as they are.
    #[default]
    Preserve,
    /// Expand nested values into dotted keys (`a.b`, `a.0`).
    Flatten,
    /// Refuse nested values.
    Reject,
}

impl NestedValuePolicy {
    /// Apply the policy to a full attribute map.
    pub fn apply(self, attrs: AttrMap) -> GraphResult<AttrMap> {
        match self {
            NestedValuePolicy::Preserve => Ok(attrs),
            NestedValuePolicy::Flatten => {
                let mut flat = AttrMap::new();
                for (key, value) in attrs {
                    flatten_into(&mut flat, key, value);
                }
                Ok(flat)
            }
            NestedValuePolicy::Reject => {
                if let Some((key, _)) = attrs.iter().find(|(_, v)| is_nested(v)) {
                    return Err(GraphError::InvalidAttribute {
                        key: key.clone(),
                        reason: "nested values are rejected by the current policy".to_string(),
                    });
                }
                Ok(attrs)
            }
        }
    }
}

impl fmt::Display for NestedValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestedValuePolicy::Preserve => write!(f, "preserve"),
            NestedValuePolicy::Flatten => write!(f, "flatten"),
            NestedValuePolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for NestedValuePolicy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(NestedValuePolicy::Preserve),
            "flatten" => Ok(NestedValuePolicy::Flatten),
            "reject" => Ok(NestedValuePolicy::Reject),
            other => Err(GraphError::Configuration(format!(
                "unknown nested value policy '{}' (expected preserve, flatten or reject)",
                other
            ))),
        }
    }
}

/// Whether a value is a non-empty mapping or sequence.
fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

fn flatten_into(out: &mut AttrMap, prefix: String, value: Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(out, format!("{}.{}", prefix, key), inner);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, inner) in items.into_iter().enumerate() {
                flatten_into(out, format!("{}.{}", prefix, index), inner);
            }
        }
        scalar => {
            out.insert(prefix, scalar);
        }
    }
}

/// Canonical string form of a key value, used by the uniqueness index.
///
/// Strings index by their raw content so `"web1"` and `web1` lookups agree;
/// everything else uses compact JSON.
pub(crate) fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build an [`AttrMap`] from `(key, value)` pairs.
pub fn attrs<K, V, I>(pairs: I) -> AttrMap
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
