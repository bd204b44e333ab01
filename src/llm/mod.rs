//! Chat model abstraction.
//!
//! Every provider is reached through [`LlmClient`]. The shipped implementation,
//! [`OpenAiClient`], speaks the OpenAI-compatible chat completions API which
//! OpenAI, AIML and Gemini all expose.

#[cfg(test)]
pub(crate) mod mock;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AgentflowError, Result, config::LlmConfig};

pub use openai::OpenAiClient;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A structured tool call requested by a model with native function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Tool description sent to models with native function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn carrying native tool calls.
    pub fn assistant_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Result of a native tool call.
    pub fn tool(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Parameters for one chat completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Non-empty only when native tool calling is in use.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_temperature(
        mut self,
        temperature: f32,
    ) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tools(
        mut self,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        self.tools = tools;
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Response from a chat completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A chat model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn chat(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse>;

    /// Send a chat completion request, handing each content delta to
    /// `on_token` as it arrives. Returns the assembled response.
    ///
    /// Clients without streaming support deliver the whole content as one delta.
    /// Structured tool calls are not streamed; callers use [`LlmClient::chat`]
    /// when tools are attached.
    async fn chat_stream(
        &self,
        request: ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<ChatResponse> {
        let response = self.chat(request).await?;
        if !response.content.is_empty() {
            on_token(&response.content);
        }
        Ok(response)
    }

    /// Model name used for requests.
    fn model(&self) -> &str;

    /// Whether the model honours structured tool definitions.
    fn supports_native_tools(&self) -> bool {
        false
    }
}

/// Convenience for the common "one system prompt, one user turn" call.
pub async fn complete(
    llm: &dyn LlmClient,
    system: Option<&str>,
    prompt: &str,
    temperature: Option<f32>,
) -> Result<String> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let mut request = ChatRequest::new(messages);
    request.temperature = temperature;
    Ok(llm.chat(request).await?.content)
}

/// Create a client from config. Fails when no api key is configured.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AgentflowError::Config(format!("missing api key for provider '{}'", config.provider.as_ref())))?;

    let client = OpenAiClient::new(config.base_url(), api_key, config.model(), config.timeout_secs)?;
    Ok(Arc::new(client))
}
