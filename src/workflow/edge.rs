//! Workflow edge definitions for connecting nodes.
//!
//! Edges define the execution flow between nodes. Outgoing edges of a
//! condition node carry a `true` or `false` source handle.

use serde::{Deserialize, Serialize};

use crate::{EdgeModel, workflow::node::NodeId};

/// Unique identifier for an edge within a workflow.
pub type EdgeId = String;

/// Fixed source handle types.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FixedHandle {
    /// Default output handle for sequential flow.
    #[default]
    Source,
    /// True branch for condition nodes.
    True,
    /// False branch for condition nodes.
    False,
}

impl From<bool> for FixedHandle {
    fn from(value: bool) -> Self {
        if value { FixedHandle::True } else { FixedHandle::False }
    }
}

/// Source handle identifying which output port of a node an edge originates from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceHandle {
    Fixed(FixedHandle),
    /// Any other handle name set by the editor.
    Named(String),
}

impl Default for SourceHandle {
    fn default() -> Self {
        SourceHandle::Fixed(FixedHandle::default())
    }
}

impl SourceHandle {
    pub fn parse(handle: Option<&str>) -> Self {
        match handle {
            None => SourceHandle::default(),
            Some(h) => h.parse::<FixedHandle>().map(SourceHandle::Fixed).unwrap_or_else(|_| SourceHandle::Named(h.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SourceHandle::Fixed(h) => h.as_ref(),
            SourceHandle::Named(n) => n,
        }
    }
}

/// Runtime edge representation connecting two nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// ID of the source node.
    pub source: NodeId,
    /// ID of the target node.
    pub target: NodeId,
    /// Which output handle this edge connects from.
    pub source_handle: SourceHandle,
}

impl From<&EdgeModel> for Edge {
    fn from(model: &EdgeModel) -> Self {
        Self {
            id: model.id.clone(),
            source: model.source.clone(),
            target: model.target.clone(),
            source_handle: SourceHandle::parse(model.source_handle.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handle() {
        assert_eq!(SourceHandle::parse(None), SourceHandle::Fixed(FixedHandle::Source));
        assert_eq!(SourceHandle::parse(Some("true")), SourceHandle::Fixed(FixedHandle::True));
        assert_eq!(SourceHandle::parse(Some("false")).name(), "false");
        assert_eq!(SourceHandle::parse(Some("case-1")), SourceHandle::Named("case-1".to_string()));
    }
}
