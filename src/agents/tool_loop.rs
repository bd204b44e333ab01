//! The tool-calling loop.
//!
//! Models without structured function calling are driven by text markers:
//!
//! ```text
//! USE_TOOL: calculator
//! PARAMETERS: {"expression": "2+2"}
//! ```
//!
//! answered with a `TOOL_RESULT:` (or `TOOL_ERROR:`) user turn, until the model
//! replies with `FINAL_ANSWER: <text>`. Models that support native tool calls
//! follow the provider's `tool_calls` instead when enabled.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    AgentflowError, Result,
    agents::AgentDefinition,
    events::{AgentEvent, GraphEvent},
    llm::{ChatRequest, ChatResponse, Message, ToolDefinition},
    runtime::Context,
};

const USE_TOOL: &str = "USE_TOOL:";
const PARAMETERS: &str = "PARAMETERS:";
const FINAL_ANSWER: &str = "FINAL_ANSWER:";

static TOOL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"USE_TOOL:\s*(\w+)").expect("tool name pattern is valid"));
static PARAMETERS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PARAMETERS:\s*(\{[^}]*\})").expect("parameters pattern is valid"));

/// Input of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub agent_id: String,
    pub input: String,
    /// conversation whose history is loaded and extended
    #[serde(default)]
    pub session_id: Option<String>,
    /// overrides `agent.max_iterations` from config
    #[serde(default)]
    pub max_iterations: Option<usize>,
    /// emit the final answer as `token` events while the model writes it
    #[serde(default)]
    pub stream: bool,
}

impl AgentRequest {
    pub fn new(
        agent_id: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_session(
        mut self,
        session_id: impl Into<String>,
    ) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_stream(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// One tool invocation made during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a successful agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub agent_id: String,
    pub output: String,
    pub iterations: usize,
    pub tool_calls: Vec<ToolInvocation>,
}

/// What the loop does with one model reply.
#[derive(Debug, PartialEq)]
enum Step {
    /// run a tool, then feed back its result
    CallTool {
        name: String,
        params: Value,
    },
    /// tell the model what went wrong and ask again
    Correct(String),
    Finish(String),
}

/// Run the tool-calling loop of `agent` on `request.input`.
///
/// Events are emitted on the context's channel with `nid` as node id.
pub async fn run(
    ctx: &Context,
    nid: &str,
    agent: &AgentDefinition,
    request: &AgentRequest,
) -> Result<AgentResult> {
    let services = ctx.services();
    let max_iterations = request.max_iterations.unwrap_or(services.config.agent.max_iterations).max(1);
    let tool_defs = services.tools.definitions(&agent.tools);
    let native = services.config.agent.native_tools && services.llm.supports_native_tools() && !tool_defs.is_empty();

    let mut messages = vec![Message::system(system_prompt(agent, &tool_defs, native))];
    if let Some(session_id) = &request.session_id {
        messages.extend(services.memory.history(session_id));
    }
    messages.push(Message::user(request.input.clone()));

    let emitter = Emitter {
        ctx,
        nid,
        agent_id: &agent.id,
    };
    let mut tool_calls = Vec::new();

    for iteration in 1..=max_iterations {
        emitter.emit(AgentEvent::IterationStart {
            agent_id: agent.id.clone(),
            iteration,
            max_iterations,
        });
        emitter.emit(AgentEvent::LlmStart {
            agent_id: agent.id.clone(),
            messages: messages.len(),
        });

        let mut chat = ChatRequest::new(messages.clone()).with_temperature(agent.temperature);
        if native {
            chat = chat.with_tools(tool_defs.clone());
        }
        let mut tokens = TokenFilter::new(tool_defs.is_empty());
        let response = if request.stream && !native {
            let mut on_token = |delta: &str| {
                if let Some(content) = tokens.push(delta) {
                    emitter.emit(AgentEvent::Token {
                        agent_id: agent.id.clone(),
                        content,
                    });
                }
            };
            services.llm.chat_stream(chat, &mut on_token).await?
        } else {
            services.llm.chat(chat).await?
        };
        emitter.emit(AgentEvent::LlmEnd {
            agent_id: agent.id.clone(),
            content: response.content.clone(),
        });
        debug!(agent = %agent.id, iteration, response = %response.content, "agent response");

        let finished = if native {
            native_step(&emitter, agent, response, &mut messages, &mut tool_calls).await
        } else {
            marker_step(&emitter, agent, &tool_defs, iteration, response.content, &mut messages, &mut tool_calls).await
        };

        emitter.emit(AgentEvent::IterationEnd {
            agent_id: agent.id.clone(),
            iteration,
        });

        if let Some(output) = finished {
            if let Some(content) = tokens.finish(&output).filter(|_| request.stream) {
                emitter.emit(AgentEvent::Token {
                    agent_id: agent.id.clone(),
                    content,
                });
            }
            if let Some(session_id) = &request.session_id {
                services.memory.append(session_id, [Message::user(request.input.clone()), Message::assistant(output.clone())]);
            }
            return Ok(AgentResult {
                agent_id: agent.id.clone(),
                output,
                iterations: iteration,
                tool_calls,
            });
        }
    }

    warn!(agent = %agent.id, max_iterations, "agent did not produce a final answer");
    Err(AgentflowError::MaxIterations(max_iterations))
}

#[derive(Debug)]
enum TokenState {
    /// not yet known whether the reply is an answer
    Pending(String),
    Streaming,
    /// the reply is a tool call
    Held,
}

/// Picks the final answer out of streamed marker-protocol deltas.
#[derive(Debug)]
struct TokenFilter {
    state: TokenState,
    /// a reply without markers is already the answer
    direct: bool,
    sent: bool,
}

impl TokenFilter {
    fn new(direct: bool) -> Self {
        Self {
            state: TokenState::Pending(String::new()),
            direct,
            sent: false,
        }
    }

    /// Feed one delta, returning the part of it that belongs to the answer.
    fn push(
        &mut self,
        delta: &str,
    ) -> Option<String> {
        let text = match &mut self.state {
            TokenState::Held => return None,
            TokenState::Streaming => delta.to_string(),
            TokenState::Pending(buffer) => {
                buffer.push_str(delta);
                if let Some(i) = buffer.find(FINAL_ANSWER) {
                    if buffer[..i].contains("USE_TOOL") {
                        self.state = TokenState::Held;
                        return None;
                    }
                    let rest = buffer[i + FINAL_ANSWER.len()..].to_string();
                    self.state = TokenState::Streaming;
                    rest
                } else if buffer.contains("USE_TOOL") {
                    self.state = TokenState::Held;
                    return None;
                } else if self.direct && !FINAL_ANSWER.starts_with(buffer.trim_start()) {
                    let head = buffer.clone();
                    self.state = TokenState::Streaming;
                    head
                } else {
                    return None;
                }
            }
        };

        let text = if self.sent { text.as_str() } else { text.trim_start() };
        if text.is_empty() {
            return None;
        }
        self.sent = true;
        Some(text.to_string())
    }

    /// The whole answer when none of it went out while streaming.
    fn finish(
        &self,
        answer: &str,
    ) -> Option<String> {
        (!self.sent && !answer.is_empty()).then(|| answer.to_string())
    }
}

/// Handle one marker-protocol reply. Returns the final answer when the run is done.
async fn marker_step(
    emitter: &Emitter<'_>,
    agent: &AgentDefinition,
    tool_defs: &[ToolDefinition],
    iteration: usize,
    content: String,
    messages: &mut Vec<Message>,
    tool_calls: &mut Vec<ToolInvocation>,
) -> Option<String> {
    let step = parse_step(&content, iteration, tool_defs);
    match step {
        Step::Finish(answer) => Some(answer),
        Step::Correct(reason) => {
            messages.push(Message::assistant(content));
            messages.push(Message::user(reason));
            None
        }
        Step::CallTool {
            name,
            params,
        } => {
            messages.push(Message::assistant(content));
            let turn = match emitter.call_tool(agent, &name, params, tool_calls).await {
                Ok(output) => format!("TOOL_RESULT: {}", output),
                Err(e) => format!("TOOL_ERROR: {}", e),
            };
            messages.push(Message::user(turn));
            None
        }
    }
}

/// Handle one native tool-calling reply.
async fn native_step(
    emitter: &Emitter<'_>,
    agent: &AgentDefinition,
    response: ChatResponse,
    messages: &mut Vec<Message>,
    tool_calls: &mut Vec<ToolInvocation>,
) -> Option<String> {
    if response.tool_calls.is_empty() {
        let content = response.content.trim();
        let answer = content.find(FINAL_ANSWER).map(|i| content[i + FINAL_ANSWER.len()..].trim()).unwrap_or(content);
        return Some(answer.to_string());
    }

    messages.push(Message::assistant_tool_calls(response.content, response.tool_calls.clone()));
    for call in response.tool_calls {
        let content = match emitter.call_tool(agent, &call.name, call.arguments, tool_calls).await {
            Ok(output) => output.to_string(),
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        };
        messages.push(Message::tool(call.id, content));
    }
    None
}

/// Decide what to do with a marker-protocol reply.
fn parse_step(
    content: &str,
    iteration: usize,
    tool_defs: &[ToolDefinition],
) -> Step {
    if content.contains(USE_TOOL) && content.contains(PARAMETERS) {
        let Some(name) = TOOL_NAME_RE.captures(content).map(|c| c[1].to_string()) else {
            return Step::Correct(format!("ERROR: Could not read the tool name. Use the format `USE_TOOL: <tool_name>`. {}", available(tool_defs)));
        };
        let Some(raw) = PARAMETERS_RE.captures(content).map(|c| c[1].to_string()) else {
            return Step::Correct("ERROR: PARAMETERS must be a JSON object, e.g. PARAMETERS: {\"key\": \"value\"}".to_string());
        };
        let params = match serde_json::from_str::<Value>(&raw) {
            Ok(params) => params,
            Err(e) => return Step::Correct(format!("ERROR: Invalid JSON in PARAMETERS ({}). Please try again with valid JSON.", e)),
        };
        if !tool_defs.iter().any(|t| t.name == name) {
            return Step::Correct(format!("ERROR: Unknown tool '{}'. {}", name, available(tool_defs)));
        }
        return Step::CallTool {
            name,
            params,
        };
    }

    if let Some(i) = content.find(FINAL_ANSWER) {
        return Step::Finish(content[i + FINAL_ANSWER.len()..].trim().to_string());
    }

    // without tools there is nothing to wait for
    if (iteration > 1 || tool_defs.is_empty()) && !content.contains("USE_TOOL") {
        return Step::Finish(content.trim().to_string());
    }

    if content.contains("USE_TOOL") {
        Step::Correct("ERROR: A tool call needs both `USE_TOOL: <tool_name>` and `PARAMETERS: <json object>`.".to_string())
    } else {
        Step::Correct("Remember to respond using the required format: either call a tool with USE_TOOL/PARAMETERS or give your answer as `FINAL_ANSWER: <answer>`.".to_string())
    }
}

fn available(tool_defs: &[ToolDefinition]) -> String {
    let names: Vec<&str> = tool_defs.iter().map(|t| t.name.as_str()).collect();
    format!("Available tools: {}", names.join(", "))
}

fn system_prompt(
    agent: &AgentDefinition,
    tool_defs: &[ToolDefinition],
    native: bool,
) -> String {
    if native || tool_defs.is_empty() {
        return agent.system_prompt.clone();
    }

    let mut prompt = agent.system_prompt.clone();
    prompt.push_str("\n\nYou have access to the following tools:\n");
    for tool in tool_defs {
        prompt.push_str(&format!("- {}: {}\n  Parameters schema: {}\n", tool.name, tool.description, tool.parameters));
    }
    prompt.push_str(
        "\nTo use a tool, respond with exactly these two lines and nothing else:\n\
         USE_TOOL: <tool_name>\n\
         PARAMETERS: <JSON object with the tool parameters>\n\n\
         You will receive the result as TOOL_RESULT (or TOOL_ERROR). \
         When you have everything you need, respond with:\n\
         FINAL_ANSWER: <your complete answer>",
    );
    prompt
}

/// Emits agent events and runs tools on behalf of one run.
struct Emitter<'a> {
    ctx: &'a Context,
    nid: &'a str,
    agent_id: &'a str,
}

impl Emitter<'_> {
    fn emit(
        &self,
        event: AgentEvent,
    ) {
        self.ctx.emit(self.nid.to_string(), GraphEvent::Agent(event));
    }

    async fn call_tool(
        &self,
        agent: &AgentDefinition,
        name: &str,
        params: Value,
        tool_calls: &mut Vec<ToolInvocation>,
    ) -> Result<Value> {
        self.emit(AgentEvent::ToolStart {
            agent_id: self.agent_id.to_string(),
            tool: name.to_string(),
            input: params.clone(),
        });

        let result = if agent.tools.iter().any(|t| t == name) {
            self.ctx.services().tools.execute(name, params.clone()).await
        } else {
            Err(AgentflowError::Tool(format!("tool '{}' is not available to agent '{}'", name, agent.id)))
        };

        match &result {
            Ok(output) => {
                self.emit(AgentEvent::ToolEnd {
                    agent_id: self.agent_id.to_string(),
                    tool: name.to_string(),
                    output: output.clone(),
                });
                tool_calls.push(ToolInvocation {
                    tool: name.to_string(),
                    input: params,
                    output: Some(output.clone()),
                    error: None,
                });
            }
            Err(e) => {
                warn!(agent = %agent.id, tool = name, error = %e, "tool call failed");
                self.emit(AgentEvent::ToolError {
                    agent_id: self.agent_id.to_string(),
                    tool: name.to_string(),
                    error: e.to_string(),
                });
                tool_calls.push(ToolInvocation {
                    tool: name.to_string(),
                    input: params,
                    output: None,
                    error: Some(e.to_string()),
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::{
        agents::AgentRegistry,
        llm::{ChatResponse, ToolCall, mock::ScriptedLlm},
        runtime::{ChannelEvent, ChannelOptions, context_with},
    };

    fn generalist() -> AgentDefinition {
        AgentRegistry::new().get("generalist").unwrap()
    }

    fn calc_defs() -> Vec<ToolDefinition> {
        crate::tools::ToolRegistry::with_builtins().definitions(&["calculator".to_string()])
    }

    #[test]
    fn test_parse_step() {
        let defs = calc_defs();
        assert_eq!(
            parse_step("USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"2+2\"}", 1, &defs),
            Step::CallTool {
                name: "calculator".to_string(),
                params: json!({"expression": "2+2"}),
            }
        );
        assert_eq!(parse_step("thinking...\nFINAL_ANSWER:  4 \n", 1, &defs), Step::Finish("4".to_string()));
        assert!(matches!(parse_step("USE_TOOL: calculator\nPARAMETERS: {oops}", 1, &defs), Step::Correct(m) if m.contains("Invalid JSON")));
        assert!(matches!(parse_step("USE_TOOL: teleport\nPARAMETERS: {}", 1, &defs), Step::Correct(m) if m.contains("Unknown tool")));
        assert!(matches!(parse_step("just chatting", 1, &defs), Step::Correct(_)));
        assert_eq!(parse_step("just chatting", 2, &defs), Step::Finish("just chatting".to_string()));
        assert!(matches!(parse_step("USE_TOOL: calculator", 2, &defs), Step::Correct(_)));
        assert_eq!(parse_step("plain answer", 1, &[]), Step::Finish("plain answer".to_string()));
    }

    #[test]
    fn test_token_filter() {
        let mut tokens = TokenFilter::new(false);
        let pieces: Vec<_> = ["I know. FINAL_", "ANSWER:", " Hel", "lo"].iter().filter_map(|d| tokens.push(d)).collect();
        assert_eq!(pieces, vec!["Hel", "lo"]);
        assert_eq!(tokens.finish("Hello"), None);

        let mut tokens = TokenFilter::new(false);
        assert!(["USE_TOOL: calc", "ulator\nPARAMETERS: {}", " FINAL_ANSWER: no"].iter().all(|d| tokens.push(d).is_none()));

        let mut tokens = TokenFilter::new(false);
        assert_eq!(tokens.push("just chatting"), None);
        assert_eq!(tokens.finish("just chatting"), Some("just chatting".to_string()));

        let mut tokens = TokenFilter::new(true);
        assert_eq!(tokens.push(" FINAL"), None);
        assert_eq!(tokens.push("ly done"), Some("FINALly done".to_string()));
        assert_eq!(tokens.push(" now"), Some(" now".to_string()));
    }

    #[tokio::test]
    async fn test_stream_tokens_on_final_turn() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"2+2\"}", "FINAL_ANSWER: The sum is 4"]).chunked(3));
        let ctx = context_with(llm, None);
        let tokens = Arc::new(Mutex::new(vec![]));
        let t = tokens.clone();
        ChannelEvent::channel(ctx.channel(), ChannelOptions::default()).unwrap().on_agent(move |_, e| {
            if let AgentEvent::Token {
                content,
                ..
            } = e
            {
                t.lock().unwrap().push(content.clone());
            }
        });

        let request = AgentRequest::new("generalist", "2+2?").with_stream();
        let result = run(&ctx, "a", &generalist(), &request).await.unwrap();

        let tokens = tokens.lock().unwrap();
        assert!(tokens.len() > 1);
        assert_eq!(tokens.concat(), result.output);
        assert_eq!(result.output, "The sum is 4");
    }

    #[tokio::test]
    async fn test_calculator_round_trip() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"2+2\"}", "FINAL_ANSWER: 4"]));
        let ctx = context_with(llm.clone(), None);

        let result = run(&ctx, "agent-1", &generalist(), &AgentRequest::new("generalist", "What is 2+2?")).await.unwrap();

        assert_eq!(result.output, "4");
        assert_eq!(result.iterations, 2);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].tool, "calculator");
        assert_eq!(result.tool_calls[0].input, json!({"expression": "2+2"}));
        assert_eq!(result.tool_calls[0].output, Some(json!({"expression": "2+2", "result": 4})));

        let second = &llm.requests()[1];
        let last = second.messages.last().unwrap();
        assert!(last.content.starts_with("TOOL_RESULT: "));
        assert!(last.content.contains("\"result\":4"));
        assert!(crate::llm::mock::system_text(second).contains("USE_TOOL: <tool_name>"));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let llm = Arc::new(ScriptedLlm::from_fn(|_| Ok(ChatResponse::text("USE_TOOL: calculator\nPARAMETERS: not json"))));
        let ctx = context_with(llm.clone(), None);

        let err = run(&ctx, "a", &generalist(), &AgentRequest::new("generalist", "loop forever")).await.unwrap_err();

        assert_eq!(err, AgentflowError::MaxIterations(10));
        assert!(err.to_string().contains("Max iterations reached"));
        assert_eq!(llm.calls(), 10);
    }

    #[tokio::test]
    async fn test_tool_error_becomes_turn() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"1/0\"}", "FINAL_ANSWER: undefined"]));
        let ctx = context_with(llm.clone(), None);

        let result = run(&ctx, "a", &generalist(), &AgentRequest::new("generalist", "1/0?")).await.unwrap();

        assert_eq!(result.output, "undefined");
        assert!(result.tool_calls[0].error.as_deref().unwrap().contains("division by zero"));
        let last = llm.requests()[1].messages.last().unwrap().clone();
        assert!(last.content.starts_with("TOOL_ERROR: "));
    }

    #[tokio::test]
    async fn test_tool_not_granted_to_agent() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: http_get\nPARAMETERS: {\"url\":\"http://x\"}", "FINAL_ANSWER: ok"]));
        let ctx = context_with(llm.clone(), None);
        let writer = AgentRegistry::new().get("writer").unwrap();

        let result = run(&ctx, "a", &writer, &AgentRequest::new("writer", "fetch")).await.unwrap();

        assert!(result.tool_calls.is_empty());
        assert!(llm.requests()[1].messages.last().unwrap().content.contains("Unknown tool 'http_get'"));
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let llm = Arc::new(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"3*3\"}", "FINAL_ANSWER: 9"]));
        let ctx = context_with(llm, None);
        let names = Arc::new(Mutex::new(vec![]));
        let n = names.clone();
        ChannelEvent::channel(ctx.channel(), ChannelOptions::default()).unwrap().on_agent(move |_, e| n.lock().unwrap().push(e.str().to_string()));

        run(&ctx, "a", &generalist(), &AgentRequest::new("generalist", "3*3")).await.unwrap();

        assert_eq!(
            *names.lock().unwrap(),
            vec![
                "iteration_start",
                "llm_start",
                "llm_end",
                "tool_start",
                "tool_end",
                "iteration_end",
                "iteration_start",
                "llm_start",
                "llm_end",
                "iteration_end"
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_history_loaded_and_extended() {
        let llm = Arc::new(ScriptedLlm::new(["FINAL_ANSWER: Paris", "FINAL_ANSWER: About 2 million"]));
        let ctx = context_with(llm.clone(), None);
        let session = ctx.services().memory.create();

        let request = AgentRequest::new("generalist", "Capital of France?").with_session(session.id.clone());
        run(&ctx, "a", &generalist(), &request).await.unwrap();
        let request = AgentRequest::new("generalist", "Its population?").with_session(session.id.clone());
        run(&ctx, "a", &generalist(), &request).await.unwrap();

        let second = &llm.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[2].content, "Paris");
        assert_eq!(ctx.services().memory.history(&session.id).len(), 4);
    }

    #[tokio::test]
    async fn test_native_tool_calls() {
        let llm = Arc::new(
            ScriptedLlm::with_responses([
                ChatResponse {
                    tool_calls: vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "calculator".to_string(),
                        arguments: json!({"expression": "6*7"}),
                    }],
                    ..Default::default()
                },
                ChatResponse::text("42"),
            ])
            .native_tools(),
        );
        let mut config = crate::Config::default();
        config.agent.native_tools = true;
        let services = Arc::new(crate::runtime::Services::new(config, llm.clone(), crate::tools::ToolRegistry::with_builtins()));
        let ctx = Context::new("e".to_string(), None, services, Arc::new(crate::runtime::Channel::new()));

        let result = run(&ctx, "a", &generalist(), &AgentRequest::new("generalist", "6*7?")).await.unwrap();

        assert_eq!(result.output, "42");
        assert_eq!(result.tool_calls[0].output.as_ref().unwrap()["result"], json!(42));
        let requests = llm.requests();
        assert_eq!(requests[0].tools.len(), 4);
        assert!(!crate::llm::mock::system_text(&requests[0]).contains("USE_TOOL"));
        let tool_turn = requests[1].messages.last().unwrap();
        assert_eq!(tool_turn.tool_call_id.as_deref(), Some("call_1"));
    }
}
