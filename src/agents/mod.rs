//! Agents: a system prompt, a set of tools and the loop that drives them.

mod multi;
mod registry;
mod tool_loop;

pub use multi::{AgentOutcome, ExecutionMode, MultiAgentRequest, MultiAgentResult, SupervisorPlan, run as run_multi};
pub use registry::{AgentDefinition, AgentRegistry, GENERALIST, SUPERVISOR};
pub use tool_loop::{AgentRequest, AgentResult, ToolInvocation};

use crate::{AgentflowError, Result, runtime::Context};

/// Run a registered agent.
pub async fn run_agent(
    ctx: &Context,
    nid: &str,
    request: &AgentRequest,
) -> Result<AgentResult> {
    let agent = ctx.services().agents.get(&request.agent_id).ok_or_else(|| AgentflowError::Agent(format!("agent '{}' not found", request.agent_id)))?;
    tool_loop::run(ctx, nid, &agent, request).await
}
