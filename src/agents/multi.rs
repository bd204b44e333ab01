//! Multi-agent execution: parallel, sequential and supervised modes.

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    AgentflowError, Result,
    agents::{AgentRequest, GENERALIST, SUPERVISOR, tool_loop},
    llm,
    runtime::Context,
};

const SEPARATOR: &str = "\n\n---\n\n";

static JSON_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("json span pattern is valid"));

/// How the selected agents are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExecutionMode {
    Parallel,
    #[default]
    Sequential,
    Supervised,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentRequest {
    pub task: String,
    /// agents to run; for supervised mode the candidates offered to the
    /// supervisor (all agents when empty)
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// per-agent task replacing `task`
    #[serde(default)]
    pub task_overrides: HashMap<String, String>,
    /// read-only context appended to every agent's prompt
    #[serde(default)]
    pub shared_context: Option<Value>,
}

/// Outcome of one agent inside a multi-agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutcome {
    pub agent_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iterations: usize,
}

/// Supervisor decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorPlan {
    pub selected_agents: Vec<String>,
    #[serde(default)]
    pub execution_mode: String,
    #[serde(default)]
    pub task_breakdown: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentResult {
    /// at least one agent succeeded
    pub success: bool,
    /// successful outputs labelled with their agent id
    pub output: String,
    /// mode the agents actually ran in
    pub mode: ExecutionMode,
    pub results: Vec<AgentOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SupervisorPlan>,
}

/// Run several agents on one task.
pub async fn run(
    ctx: &Context,
    nid: &str,
    request: &MultiAgentRequest,
) -> Result<MultiAgentResult> {
    info!(mode = request.mode.as_ref(), agents = ?request.agents, "multi-agent run");

    let (mode, agents, overrides, plan) = match request.mode {
        ExecutionMode::Supervised => match supervise(ctx, request).await {
            Some(plan) => {
                let mode = match plan.execution_mode.parse::<ExecutionMode>() {
                    Ok(ExecutionMode::Parallel) => ExecutionMode::Parallel,
                    _ => ExecutionMode::Sequential,
                };
                (mode, plan.selected_agents.clone(), plan.task_breakdown.clone(), Some(plan))
            }
            None => {
                warn!("supervisor plan unusable, falling back to {}", GENERALIST);
                (ExecutionMode::Sequential, vec![GENERALIST.to_string()], HashMap::new(), None)
            }
        },
        mode => {
            if request.agents.is_empty() {
                return Err(AgentflowError::Agent("no agents selected".to_string()));
            }
            (mode, request.agents.clone(), request.task_overrides.clone(), None)
        }
    };

    let results = match mode {
        ExecutionMode::Parallel => run_parallel(ctx, nid, request, &agents, &overrides).await,
        _ => run_sequential(ctx, nid, request, &agents, &overrides).await,
    };

    let output = results
        .iter()
        .filter_map(|r| r.output.as_ref().filter(|_| r.success).map(|o| format!("## {}\n{}", r.agent_id, o)))
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    Ok(MultiAgentResult {
        success: results.iter().any(|r| r.success),
        output,
        mode,
        results,
        plan,
    })
}

async fn run_parallel(
    ctx: &Context,
    nid: &str,
    request: &MultiAgentRequest,
    agents: &[String],
    overrides: &HashMap<String, String>,
) -> Vec<AgentOutcome> {
    let runs = agents.iter().map(|agent_id| {
        let prompt = agent_prompt(request, agent_id, overrides, &[]);
        async move { run_one(ctx, nid, agent_id, prompt).await }
    });
    join_all(runs).await
}

async fn run_sequential(
    ctx: &Context,
    nid: &str,
    request: &MultiAgentRequest,
    agents: &[String],
    overrides: &HashMap<String, String>,
) -> Vec<AgentOutcome> {
    let mut previous: Vec<(String, String)> = vec![];
    let mut results = Vec::with_capacity(agents.len());

    for agent_id in agents {
        let prompt = agent_prompt(request, agent_id, overrides, &previous);
        let outcome = run_one(ctx, nid, agent_id, prompt).await;
        match (&outcome.output, &outcome.error) {
            (Some(output), _) if outcome.success => previous.push((agent_id.clone(), output.clone())),
            (_, error) => warn!(agent = %agent_id, error = ?error, "agent failed, continuing with the next one"),
        }
        results.push(outcome);
    }
    results
}

async fn run_one(
    ctx: &Context,
    nid: &str,
    agent_id: &str,
    prompt: String,
) -> AgentOutcome {
    let result = match ctx.services().agents.get(agent_id) {
        Some(agent) => tool_loop::run(ctx, nid, &agent, &AgentRequest::new(agent_id, prompt)).await,
        None => Err(AgentflowError::Agent(format!("agent '{}' not found", agent_id))),
    };

    match result {
        Ok(r) => AgentOutcome {
            agent_id: agent_id.to_string(),
            success: true,
            output: Some(r.output),
            error: None,
            iterations: r.iterations,
        },
        Err(e) => AgentOutcome {
            agent_id: agent_id.to_string(),
            success: false,
            output: None,
            error: Some(e.to_string()),
            iterations: 0,
        },
    }
}

fn agent_prompt(
    request: &MultiAgentRequest,
    agent_id: &str,
    overrides: &HashMap<String, String>,
    previous: &[(String, String)],
) -> String {
    let mut prompt = overrides.get(agent_id).cloned().unwrap_or_else(|| request.task.clone());

    if let Some(shared) = &request.shared_context {
        let text = match shared {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        prompt.push_str("\n\nShared context:\n");
        prompt.push_str(&text);
    }

    if !previous.is_empty() {
        prompt.push_str("\n\nPrevious results:");
        for (id, output) in previous {
            prompt.push_str(&format!("\n\n[{}]:\n{}", id, output));
        }
    }
    prompt
}

/// Ask the supervisor which agents to use. `None` when no usable plan came back.
async fn supervise(
    ctx: &Context,
    request: &MultiAgentRequest,
) -> Option<SupervisorPlan> {
    let services = ctx.services();
    let supervisor = services.agents.get(SUPERVISOR)?;
    let candidates: Vec<_> = services
        .agents
        .list()
        .into_iter()
        .filter(|a| a.id != SUPERVISOR && (request.agents.is_empty() || request.agents.contains(&a.id)))
        .collect();

    let mut prompt = format!("Task:\n{}\n\nAvailable agents:\n", request.task);
    for agent in &candidates {
        prompt.push_str(&format!("- {}: {}\n", agent.id, agent.description));
    }
    prompt.push_str(
        "\nRespond with JSON only, in this exact shape:\n\
         {\"selectedAgents\": [\"agent_id\"], \"executionMode\": \"parallel\" | \"sequential\", \"taskBreakdown\": {\"agent_id\": \"sub-task\"}}",
    );

    let reply = match llm::complete(services.llm.as_ref(), Some(&supervisor.system_prompt), &prompt, Some(supervisor.temperature)).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "supervisor call failed");
            return None;
        }
    };

    let mut plan = match parse_plan(&reply) {
        Some(plan) => plan,
        None => {
            debug!(reply = %reply, "supervisor reply is not valid JSON, asking for a fix");
            let fixed = fix_json(ctx, &reply).await?;
            parse_plan(&fixed)?
        }
    };

    let mut seen = HashSet::new();
    plan.selected_agents.retain(|id| {
        let known = candidates.iter().any(|a| &a.id == id);
        if !known {
            debug!(agent = %id, "dropping unknown agent from supervisor plan");
        }
        known && seen.insert(id.clone())
    });

    if plan.selected_agents.is_empty() {
        return None;
    }
    Some(plan)
}

/// Parse the first `{...}` span of a model reply.
pub(crate) fn parse_plan(reply: &str) -> Option<SupervisorPlan> {
    let span = JSON_SPAN_RE.find(reply)?;
    serde_json::from_str(span.as_str()).ok()
}

/// One re-prompt asking the model to repair malformed JSON.
async fn fix_json(
    ctx: &Context,
    broken: &str,
) -> Option<String> {
    let prompt = format!(
        "The following text should be a JSON object with the keys \"selectedAgents\" (array of strings), \
         \"executionMode\" (string) and \"taskBreakdown\" (object of strings) but it is malformed. \
         Return only the corrected JSON object, without explanation or code fences.\n\n{}",
        broken
    );
    match llm::complete(ctx.services().llm.as_ref(), Some("You repair malformed JSON."), &prompt, Some(0.0)).await {
        Ok(fixed) => Some(fixed),
        Err(e) => {
            warn!(error = %e, "json fixer call failed");
            None
        }
    }
}
