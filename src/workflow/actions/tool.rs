use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AgentflowError, Result,
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId},
};

use super::{Action, ActionOutput};

/// Calls a registered tool directly, without a model in the loop.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolAction {
    tool_name: String,
    /// tool input; string leaves may reference `{{path}}` tokens
    #[serde(default = "empty_object")]
    parameters: Value,
}

fn empty_object() -> Value {
    json!({})
}

#[async_trait]
#[typetag::serde]
impl Action for ToolAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["toolName"],
            "properties": {
                "toolName": {
                    "type": "string"
                },
                "parameters": {
                    "type": "object"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Tool
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        let tools = ctx.services().tools.clone();
        if !tools.contains(&self.tool_name) {
            return Err(AgentflowError::Tool(format!("tool '{}' not found", self.tool_name)));
        }

        let input = ctx.resolve_value(&self.parameters);
        ctx.emit_log(nid, format!("calling tool {} with {}", self.tool_name, input));
        let result = tools.execute(&self.tool_name, input).await?;
        Ok(ActionOutput::success(json!({ "result": result })))
    }
}
