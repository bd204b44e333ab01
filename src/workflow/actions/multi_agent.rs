use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AgentflowError, Result,
    agents::{self, ExecutionMode, MultiAgentRequest},
    runtime::Context,
    workflow::{actions::ActionType, node::NodeId},
};

use super::{Action, ActionOutput};

/// Runs several agents on one task.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentAction {
    task: String,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    mode: ExecutionMode,
    #[serde(default)]
    task_overrides: HashMap<String, String>,
    #[serde(default)]
    shared_context: Option<Value>,
}

#[async_trait]
#[typetag::serde]
impl Action for MultiAgentAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["task"],
            "properties": {
                "task": {
                    "type": "string"
                },
                "agents": {
                    "type": "array",
                    "items": { "type": "string" }
                },
                "mode": {
                    "type": "string",
                    "enum": ["parallel", "sequential", "supervised"]
                },
                "taskOverrides": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                },
                "sharedContext": {}
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::MultiAgent
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        let request = MultiAgentRequest {
            task: ctx.resolve(&self.task),
            agents: self.agents.clone(),
            mode: self.mode,
            task_overrides: self.task_overrides.iter().map(|(agent, task)| (agent.clone(), ctx.resolve(task))).collect(),
            shared_context: self.shared_context.as_ref().map(|v| ctx.resolve_value(v)),
        };

        let result = agents::run_multi(&ctx, &nid, &request).await?;
        if !result.success {
            let errors = result.results.iter().filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.agent_id, e))).collect::<Vec<_>>();
            return Err(AgentflowError::Agent(format!("all agents failed: {}", errors.join("; "))));
        }
        Ok(ActionOutput::success(serde_json::to_value(result)?))
    }
}
