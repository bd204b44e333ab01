//! Runtime workflow representation using a directed graph.
//!
//! Wraps a validated [`WorkflowModel`] in a petgraph graph whose node weights
//! carry their parsed actions.

use std::{collections::HashMap, sync::Arc};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    AgentflowError, Result, WorkflowModel,
    workflow::{
        actions::ActionType,
        edge::Edge,
        node::{Node, NodeId},
    },
};

/// Runtime workflow representation as a directed graph.
///
/// The graph is immutable once built; cycles are allowed and handled by the
/// executor's per-branch visited set.
#[derive(Clone)]
pub struct Workflow {
    id: String,
    name: String,
    graph: Arc<DiGraph<Node, Edge>>,
    indices: Arc<HashMap<NodeId, NodeIndex>>,
    trigger: NodeIndex,
}

impl Workflow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output a human-readable representation of the workflow graph
    pub fn schema(&self) -> String {
        let graph = &self.graph;
        let mut lines = Vec::new();

        lines.push(format!("=== Workflow {} ({}) ===", self.name, self.id));
        lines.push(format!("Nodes: {}, Edges: {}", graph.node_count(), graph.edge_count()));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            lines.push(format!("[{}] {} (type: {})", node.id, node.label, node.kind));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for idx in graph.edge_indices() {
            let edge = &graph[idx];
            lines.push(format!("{} --[{}]--> {} (id: {})", edge.source, edge.source_handle.name(), edge.target, edge.id));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let outgoing: Vec<String> = graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| format!("{}({})", graph[e.target()].id, e.weight().source_handle.name()))
                .collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                lines.push(format!("{} -> {}", node.id, outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }

    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.indices.get(id).map(|idx| &self.graph[*idx])
    }

    /// the single trigger node executions start from
    pub fn trigger_node(&self) -> &Node {
        &self.graph[self.trigger]
    }

    /// get all node ids
    pub fn get_all_node_ids(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    /// Get all outgoing edges from a node, in definition order
    pub fn get_outgoing_edges(
        &self,
        nid: &str,
    ) -> Vec<&Edge> {
        let Some(idx) = self.indices.get(nid) else {
            return vec![];
        };
        // petgraph yields the most recently added edge first
        let mut edges: Vec<&Edge> = self.graph.edges_directed(*idx, Direction::Outgoing).map(|e| e.weight()).collect();
        edges.reverse();
        edges
    }
}

impl TryFrom<&WorkflowModel> for Workflow {
    type Error = AgentflowError;

    fn try_from(model: &WorkflowModel) -> Result<Self> {
        let mut graph: DiGraph<Node, Edge> = DiGraph::new();
        let mut indices = HashMap::new();
        let mut triggers = vec![];

        for node_model in model.nodes.iter() {
            if indices.contains_key(&node_model.id) {
                return Err(AgentflowError::Workflow(format!("duplicate node id {}", node_model.id)));
            }
            let node = Node::new(node_model)?;
            let nid = node.id.clone();
            let is_trigger = node.uses == ActionType::Trigger;
            let idx = graph.add_node(node);
            if is_trigger {
                triggers.push(idx);
            }
            indices.insert(nid, idx);
        }

        let trigger = match triggers.as_slice() {
            [trigger] => *trigger,
            [] => return Err(AgentflowError::Workflow(format!("workflow {} has no trigger node", model.id))),
            _ => return Err(AgentflowError::Workflow(format!("workflow {} has {} trigger nodes, expected one", model.id, triggers.len()))),
        };

        for edge_model in model.edges.iter() {
            let edge = Edge::from(edge_model);
            let source = indices.get(&edge.source).ok_or(AgentflowError::Edge(format!("edge {}: source node {} not found", edge.id, edge.source)))?;
            let target = indices.get(&edge.target).ok_or(AgentflowError::Edge(format!("edge {}: target node {} not found", edge.id, edge.target)))?;
            graph.add_edge(*source, *target, edge);
        }

        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            graph: Arc::new(graph),
            indices: Arc::new(indices),
            trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn model(value: serde_json::Value) -> WorkflowModel {
        serde_json::from_value(value).unwrap()
    }

    fn linear() -> WorkflowModel {
        model(json!({
            "id": "wf",
            "name": "linear",
            "nodes": [
                {"id": "t", "type": "trigger", "label": "Start"},
                {"id": "a", "type": "transform", "label": "A", "config": {"template": "a"}},
                {"id": "b", "type": "transform", "label": "B", "config": {"template": "b"}}
            ],
            "edges": [
                {"id": "e1", "source": "t", "target": "a"},
                {"id": "e2", "source": "t", "target": "b"}
            ]
        }))
    }

    #[test]
    fn test_build_graph() {
        let workflow = Workflow::try_from(&linear()).unwrap();
        assert_eq!(workflow.trigger_node().id, "t");
        assert_eq!(workflow.get_all_node_ids(), vec!["t", "a", "b"]);
        let targets: Vec<_> = workflow.get_outgoing_edges("t").iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(workflow.get_outgoing_edges("b").is_empty());
        assert!(workflow.schema().contains("t -> a(source), b(source)"));
    }

    #[test]
    fn test_trigger_count() {
        let mut m = linear();
        m.nodes[0].kind = "transform".to_string();
        m.nodes[0].config = json!({"template": "x"});
        assert!(matches!(Workflow::try_from(&m).err().unwrap(), AgentflowError::Workflow(_)));

        let mut m = linear();
        m.nodes[1].kind = "trigger".to_string();
        assert!(matches!(Workflow::try_from(&m).err().unwrap(), AgentflowError::Workflow(_)));
    }

    #[test]
    fn test_dangling_edge() {
        let mut m = linear();
        m.edges[1].target = "missing".to_string();
        assert!(matches!(Workflow::try_from(&m).err().unwrap(), AgentflowError::Edge(_)));
    }

    #[test]
    fn test_duplicate_node_id() {
        let mut m = linear();
        m.nodes[2].id = "a".to_string();
        assert!(matches!(Workflow::try_from(&m).err().unwrap(), AgentflowError::Workflow(_)));
    }
}
