use serde::Serialize;
use serde_json::Value;

use crate::events::AgentEvent;

/// One frame of a streamed conversation reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ConversationEvent {
    ConversationId {
        conversation_id: String,
    },
    Status {
        status: String,
    },
    Token {
        content: String,
    },
    Iteration {
        iteration: usize,
        max_iterations: usize,
    },
    ToolStart {
        tool: String,
        input: Value,
    },
    ToolResult {
        tool: String,
        output: Value,
    },
    ToolError {
        tool: String,
        error: String,
    },
    Done {
        conversation_id: String,
        output: String,
        iterations: usize,
    },
    Error {
        error: String,
    },
}

impl ConversationEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ConversationEvent::ConversationId { .. } => "conversationId",
            ConversationEvent::Status { .. } => "status",
            ConversationEvent::Token { .. } => "token",
            ConversationEvent::Iteration { .. } => "iteration",
            ConversationEvent::ToolStart { .. } => "tool_start",
            ConversationEvent::ToolResult { .. } => "tool_result",
            ConversationEvent::ToolError { .. } => "tool_error",
            ConversationEvent::Done { .. } => "done",
            ConversationEvent::Error { .. } => "error",
        }
    }

    /// JSON payload of the frame.
    pub fn data(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Render as a server-sent event frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationEvent::Done { .. } | ConversationEvent::Error { .. })
    }

    /// Map a tool-loop event to the frame a client sees, if any.
    pub(crate) fn from_agent(event: &AgentEvent) -> Option<Self> {
        match event {
            AgentEvent::IterationStart {
                iteration,
                max_iterations,
                ..
            } => Some(ConversationEvent::Iteration {
                iteration: *iteration,
                max_iterations: *max_iterations,
            }),
            AgentEvent::LlmStart { .. } => Some(ConversationEvent::Status {
                status: "thinking".to_string(),
            }),
            AgentEvent::ToolStart {
                tool,
                input,
                ..
            } => Some(ConversationEvent::ToolStart {
                tool: tool.clone(),
                input: input.clone(),
            }),
            AgentEvent::ToolEnd {
                tool,
                output,
                ..
            } => Some(ConversationEvent::ToolResult {
                tool: tool.clone(),
                output: output.clone(),
            }),
            AgentEvent::ToolError {
                tool,
                error,
                ..
            } => Some(ConversationEvent::ToolError {
                tool: tool.clone(),
                error: error.clone(),
            }),
            AgentEvent::Token { content, .. } => Some(ConversationEvent::Token {
                content: content.clone(),
            }),
            AgentEvent::IterationEnd { .. } | AgentEvent::LlmEnd { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sse_frame() {
        let event = ConversationEvent::ConversationId {
            conversation_id: "c1".to_string(),
        };
        assert_eq!(event.to_sse(), "event: conversationId\ndata: {\"conversationId\":\"c1\"}\n\n");

        let event = ConversationEvent::Iteration {
            iteration: 2,
            max_iterations: 10,
        };
        assert_eq!(event.data(), json!({"iteration": 2, "maxIterations": 10}));
    }

    #[test]
    fn test_from_agent() {
        let event = AgentEvent::ToolEnd {
            agent_id: "a".to_string(),
            tool: "calculator".to_string(),
            output: json!({"result": 4}),
        };
        let mapped = ConversationEvent::from_agent(&event).unwrap();
        assert_eq!(mapped.name(), "tool_result");
        assert!(
            ConversationEvent::from_agent(&AgentEvent::IterationEnd {
                agent_id: "a".to_string(),
                iteration: 1,
            })
            .is_none()
        );

        let token = ConversationEvent::from_agent(&AgentEvent::Token {
            agent_id: "a".to_string(),
            content: "Hel".to_string(),
        })
        .unwrap();
        assert_eq!(token.data(), json!({"content": "Hel"}));
    }
}
