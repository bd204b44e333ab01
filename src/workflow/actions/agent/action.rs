use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Result,
    agents::{self, AgentRequest},
    runtime::Context,
    workflow::{
        actions::{Action, ActionOutput, ActionType},
        node::NodeId,
    },
};

/// Runs a registered agent's tool-calling loop on a resolved input.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    agent_id: String,
    /// may reference `{{path}}` tokens
    input: String,
    /// conversation whose history the agent continues
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    max_iterations: Option<usize>,
}

#[async_trait]
#[typetag::serde]
impl Action for AgentAction {
    fn create(params: Value) -> Result<Self> {
        jsonschema::validate(&params, &Self::schema())?;
        let action = serde_json::from_value::<Self>(params)?;
        Ok(action)
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["agentId", "input"],
            "properties": {
                "agentId": {
                    "type": "string",
                    "description": "Id of a built-in or custom agent"
                },
                "input": {
                    "type": "string"
                },
                "sessionId": {
                    "type": "string"
                },
                "maxIterations": {
                    "type": "integer",
                    "minimum": 1
                }
            }
        })
    }

    fn action_type(&self) -> ActionType {
        ActionType::Agent
    }

    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput> {
        let request = AgentRequest {
            agent_id: self.agent_id.clone(),
            input: ctx.resolve(&self.input),
            session_id: self.session_id.as_deref().map(|s| ctx.resolve(s)),
            max_iterations: self.max_iterations,
            ..Default::default()
        };

        let result = agents::run_agent(&ctx, &nid, &request).await?;
        Ok(ActionOutput::success(serde_json::to_value(result)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AgentflowError,
        llm::mock::{ScriptedLlm, last_user_text},
        workflow::actions::tests::run_action,
    };

    #[tokio::test]
    async fn test_agent_node_runs_tool_loop() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"6*7\"}", "FINAL_ANSWER: 42"]));
        let action = AgentAction::create(json!({"agentId": "analyst", "input": "What is {{trigger.q}}?"})).unwrap();

        let out = run_action(&action, llm.clone(), Some(json!({"q": "6*7"}))).await.unwrap();

        assert_eq!(out.outputs["output"], "42");
        assert_eq!(out.outputs["agentId"], "analyst");
        assert_eq!(out.outputs["toolCalls"][0]["output"]["result"], 42);
        assert_eq!(last_user_text(&llm.requests()[0]), "What is 6*7?");
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let action = AgentAction::create(json!({"agentId": "nobody", "input": "hi"})).unwrap();
        let err = run_action(&action, Arc::new(ScriptedLlm::new(["x"])), None).await.unwrap_err();
        assert!(matches!(err, AgentflowError::Agent(_)));
    }

    #[test]
    fn test_agent_id_required() {
        assert!(AgentAction::create(json!({"input": "hi"})).is_err());
    }
}
