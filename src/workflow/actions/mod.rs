pub mod agent;
pub mod chain;
pub mod condition;
pub mod llm;
pub mod multi_agent;
pub mod tool;
pub mod transform;
pub mod trigger;
pub mod unsupported;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    runtime::Context,
    workflow::{edge::FixedHandle, node::NodeId},
};

pub use agent::AgentAction;
pub use chain::{LlmChainAction, RouterChainAction, SequentialChainAction};
pub use condition::ConditionAction;
pub use llm::LlmAction;
pub use multi_agent::MultiAgentAction;
pub use tool::ToolAction;
pub use transform::TransformAction;
pub use trigger::TriggerAction;
pub use unsupported::UnsupportedAction;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    Trigger,
    Llm,
    LlmChain,
    SequentialChain,
    RouterChain,
    Agent,
    MultiAgent,
    Condition,
    Tool,
    Transform,
    #[default]
    Unsupported,
}

#[async_trait]
#[typetag::serde(tag = "type")]
pub trait Action: Send + Sync {
    /// Creates a new instance of the action from the node's `config`.
    ///
    /// # Arguments
    ///
    /// * `params` - The [`serde_json::Value`] containing the params for the action.
    ///
    /// # Returns
    ///
    /// Returns a [`Result`] containing the created action instance.
    fn create(params: Value) -> Result<Self>
    where
        Self: Sized;

    /// Returns the JSON schema `config` is validated against.
    fn schema() -> Value
    where
        Self: Sized;

    /// Returns the [`ActionType`] of the action.
    fn action_type(&self) -> ActionType;

    /// Executes the node's action with the given context.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The [`Context`] of the execution.
    /// * `nid` - The id of the node.
    ///
    /// # Returns
    ///
    /// Returns an [`Result<ActionOutput>`] representing the output of the action.
    async fn run(
        &self,
        ctx: Arc<Context>,
        nid: NodeId,
    ) -> Result<ActionOutput>;
}

/// Output returned by an action's run method
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    /// value written into the context under the node id and label
    pub outputs: Value,
    /// branch selected by a condition; `None` follows every outgoing edge
    pub branch: Option<FixedHandle>,
}

impl ActionOutput {
    pub fn success(outputs: Value) -> Self {
        Self {
            outputs,
            branch: None,
        }
    }

    /// Output that only lets the `true` or `false` edges through.
    pub fn branch(
        outputs: Value,
        result: bool,
    ) -> Self {
        Self {
            outputs,
            branch: Some(FixedHandle::from(result)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{llm::LlmClient, runtime::context_with};

    /// Run `action` in a fresh context seeded with `trigger`.
    pub(crate) async fn run_action(
        action: &dyn Action,
        llm: Arc<dyn LlmClient>,
        trigger: Option<Value>,
    ) -> Result<ActionOutput> {
        let ctx = Arc::new(context_with(llm, trigger));
        action.run(ctx, "node-1".to_string()).await
    }
}
