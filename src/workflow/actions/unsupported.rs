use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result,
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId},
};

use super::{Action, ActionOutput};

/// Stands in for node types the engine does not know. Produces a placeholder.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UnsupportedAction {
    kind: String,
}

impl UnsupportedAction {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
        }
    }
}

#[async_trait]
#[typetag::serde]
impl Action for UnsupportedAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["kind"],
            "properties": {
                "kind": {
                    "type": "string"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Unsupported
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        ctx.emit_log(nid, format!("node type '{}' is not supported", self.kind));
        Ok(ActionOutput::success(json!({
            "message": format!("Node type {} executed", self.kind),
            "type": self.kind,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{llm::mock::ScriptedLlm, workflow::actions::tests::run_action};

    #[tokio::test]
    async fn test_placeholder_output() {
        let action = UnsupportedAction::create(json!({"kind": "webhook"})).unwrap();
        let out = run_action(&action, Arc::new(ScriptedLlm::new(Vec::<String>::new())), None).await.unwrap();
        assert_eq!(out.outputs["type"], "webhook");
        assert_eq!(out.branch, None);
    }
}
