use serde_json::Value;

/// Progress of one tool-calling loop.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    IterationStart {
        agent_id: String,
        iteration: usize,
        max_iterations: usize,
    },
    IterationEnd {
        agent_id: String,
        iteration: usize,
    },
    LlmStart {
        agent_id: String,
        messages: usize,
    },
    LlmEnd {
        agent_id: String,
        content: String,
    },
    ToolStart {
        agent_id: String,
        tool: String,
        input: Value,
    },
    ToolEnd {
        agent_id: String,
        tool: String,
        output: Value,
    },
    ToolError {
        agent_id: String,
        tool: String,
        error: String,
    },
    /// A piece of the final answer, sent while the model is still writing.
    Token {
        agent_id: String,
        content: String,
    },
}

impl AgentEvent {
    pub fn str(&self) -> &str {
        match self {
            AgentEvent::IterationStart { .. } => "iteration_start",
            AgentEvent::IterationEnd { .. } => "iteration_end",
            AgentEvent::LlmStart { .. } => "llm_start",
            AgentEvent::LlmEnd { .. } => "llm_end",
            AgentEvent::ToolStart { .. } => "tool_start",
            AgentEvent::ToolEnd { .. } => "tool_end",
            AgentEvent::ToolError { .. } => "tool_error",
            AgentEvent::Token { .. } => "token",
        }
    }

    pub fn agent_id(&self) -> &str {
        match self {
            AgentEvent::IterationStart { agent_id, .. }
            | AgentEvent::IterationEnd { agent_id, .. }
            | AgentEvent::LlmStart { agent_id, .. }
            | AgentEvent::LlmEnd { agent_id, .. }
            | AgentEvent::ToolStart { agent_id, .. }
            | AgentEvent::ToolEnd { agent_id, .. }
            | AgentEvent::ToolError { agent_id, .. }
            | AgentEvent::Token { agent_id, .. } => agent_id,
        }
    }
}
