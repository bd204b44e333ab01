use serde::{Deserialize, Serialize};

use crate::{
    AgentflowError, Result,
    model::{EdgeModel, NodeModel},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let workflow = serde_json::from_str::<WorkflowModel>(s);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(AgentflowError::Workflow(format!("{}", e))),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let text = r#"{
            "id": "wf1",
            "name": "demo",
            "nodes": [
                {"id": "t", "type": "trigger", "label": "Trigger", "position": {"x": 0, "y": 0}},
                {"id": "c", "type": "condition", "config": {"leftValue": "1", "operator": "==", "rightValue": "1"}}
            ],
            "edges": [
                {"id": "e1", "source": "t", "target": "c"},
                {"id": "e2", "source": "c", "target": "t", "sourceHandle": "true"}
            ]
        }"#;
        let model = WorkflowModel::from_json(text).unwrap();
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.nodes[1].kind, "condition");
        assert_eq!(model.nodes[1].label, "");
        assert_eq!(model.edges[0].source_handle, None);
        assert_eq!(model.edges[1].source_handle.as_deref(), Some("true"));

        let back = WorkflowModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = WorkflowModel::from_json("{\"id\": 1}").unwrap_err();
        assert!(matches!(err, AgentflowError::Workflow(_)));
    }
}
