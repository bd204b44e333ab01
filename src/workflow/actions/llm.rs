use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    Result, llm,
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId},
};

use super::{Action, ActionOutput};

/// Single model call with a resolved prompt.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LlmAction {
    prompt: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
}

#[async_trait]
#[typetag::serde]
impl Action for LlmAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["prompt"],
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "User prompt, may reference {{variables}}"
                },
                "systemPrompt": {
                    "type": "string"
                },
                "temperature": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 2
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Llm
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        let prompt = ctx.resolve(&self.prompt);
        let system = self.system_prompt.as_deref().map(|s| ctx.resolve(s));
        debug!(node = %nid, prompt = %prompt, "llm prompt");

        let llm = ctx.services().llm.clone();
        let output = llm::complete(llm.as_ref(), system.as_deref(), &prompt, self.temperature).await?;
        Ok(ActionOutput::success(json!({
            "output": output,
            "prompt": prompt,
        })))
    }
}
