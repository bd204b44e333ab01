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

/// Entry node of every workflow. Outputs the execution's trigger data.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TriggerAction {
    /// used when the execution carries no trigger data
    #[serde(default)]
    data: Option<Value>,
}

#[async_trait]
#[typetag::serde]
impl Action for TriggerAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {
                    "description": "Default trigger data"
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Trigger
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        _: NodeId,
    ) -> Result<ActionOutput> {
        let data = match (ctx.trigger(), &self.data) {
            (Some(trigger), _) => trigger.clone(),
            (None, Some(data)) if !data.is_null() => data.clone(),
            _ => json!({ "message": "Workflow started" }),
        };
        Ok(ActionOutput::success(data))
    }
}
