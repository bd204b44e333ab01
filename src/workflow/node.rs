use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    AgentflowError, NodeModel, Result,
    workflow::actions::{
        Action, ActionType, AgentAction, ConditionAction, LlmAction, LlmChainAction, MultiAgentAction, RouterChainAction, SequentialChainAction, ToolAction,
        TransformAction, TriggerAction, UnsupportedAction,
    },
};

/// node id
pub type NodeId = String;

/// Status of a node or of a whole execution.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeExecutionStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

#[derive(Clone)]
pub struct Node {
    /// node id
    pub id: NodeId,
    /// node type as written in the definition
    pub kind: String,
    /// node label, also stored slugified as a context key
    pub label: String,
    /// uses which action
    pub uses: ActionType,
    /// node action
    pub action: Arc<dyn Action>,
}

impl Node {
    pub fn new(model: &NodeModel) -> Result<Self> {
        let uses = model.kind.parse::<ActionType>().unwrap_or(ActionType::Unsupported);
        let config = match &model.config {
            Value::Null => json!({}),
            config => config.clone(),
        };
        let action = Self::create_action(uses, &model.kind, config).map_err(|e| AgentflowError::Node(format!("invalid config for node {}: {}", model.id, e)))?;

        Ok(Self {
            id: model.id.clone(),
            kind: model.kind.clone(),
            label: model.label.clone(),
            uses,
            action,
        })
    }

    fn create_action(
        uses: ActionType,
        kind: &str,
        params: Value,
    ) -> Result<Arc<dyn Action>> {
        match uses {
            ActionType::Trigger => Ok(Arc::new(TriggerAction::create(params)?)),
            ActionType::Llm => Ok(Arc::new(LlmAction::create(params)?)),
            ActionType::LlmChain => Ok(Arc::new(LlmChainAction::create(params)?)),
            ActionType::SequentialChain => Ok(Arc::new(SequentialChainAction::create(params)?)),
            ActionType::RouterChain => Ok(Arc::new(RouterChainAction::create(params)?)),
            ActionType::Agent => Ok(Arc::new(AgentAction::create(params)?)),
            ActionType::MultiAgent => Ok(Arc::new(MultiAgentAction::create(params)?)),
            ActionType::Condition => Ok(Arc::new(ConditionAction::create(params)?)),
            ActionType::Tool => Ok(Arc::new(ToolAction::create(params)?)),
            ActionType::Transform => Ok(Arc::new(TransformAction::create(params)?)),
            ActionType::Unsupported => Ok(Arc::new(UnsupportedAction::new(kind))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(
        kind: &str,
        config: Value,
    ) -> NodeModel {
        NodeModel {
            id: "n1".to_string(),
            kind: kind.to_string(),
            label: "Node One".to_string(),
            config,
            position: None,
        }
    }

    #[test]
    fn test_node_action_by_type() {
        let node = Node::new(&model("llm", json!({"prompt": "hi"}))).unwrap();
        assert_eq!(node.uses, ActionType::Llm);
        assert_eq!(node.action.action_type(), ActionType::Llm);

        let node = Node::new(&model("trigger", Value::Null)).unwrap();
        assert_eq!(node.uses, ActionType::Trigger);
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let node = Node::new(&model("webhook", json!({}))).unwrap();
        assert_eq!(node.uses, ActionType::Unsupported);
        assert_eq!(node.kind, "webhook");
    }

    #[test]
    fn test_missing_required_field() {
        let err = Node::new(&model("tool", json!({"parameters": {}}))).err().unwrap();
        assert!(matches!(err, AgentflowError::Node(_)));
    }
}
