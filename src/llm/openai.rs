use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AgentflowError, Result,
    llm::{ChatRequest, ChatResponse, LlmClient, Message, ToolCall, ToolDefinition, Usage},
};

/// OpenAI-compatible chat completions client. Works with OpenAI, AIML and
/// Gemini's OpenAI endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    auth_header: String,
    model: String,
    native_tools: bool,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", api_key.into()),
            model: model.into(),
            native_tools: true,
        })
    }

    /// Declare whether the target model honours `tools` in requests.
    pub fn with_native_tools(
        mut self,
        enabled: bool,
    ) -> Self {
        self.native_tools = enabled;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> OaiRequest<'a> {
        OaiRequest {
            model: &self.model,
            messages: request.messages.iter().map(OaiMessage::from_domain).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request.tools.iter().map(OaiTool::from_domain).collect(),
            stream: false,
        }
    }

    async fn post(
        &self,
        body: &OaiRequest<'_>,
    ) -> Result<reqwest::Response> {
        debug!(model = %self.model, messages = body.messages.len(), tools = body.tools.len(), stream = body.stream, "chat completion request");
        let response = self.http.post(self.chat_completions_url()).header("Authorization", &self.auth_header).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentflowError::Llm(format!("provider returned {}: {}", status, text)));
        }
        Ok(response)
    }

    fn parse_response(
        &self,
        response: OaiResponse,
    ) -> Result<ChatResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| AgentflowError::Llm("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                arguments: serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::String(call.function.arguments)),
                name: call.function.name,
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: choice.finish_reason,
            usage: response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        let body = self.build_request(&request);
        let response = self.post(&body).await?;

        let parsed: OaiResponse = response.json().await.map_err(|e| AgentflowError::Llm(format!("failed to parse response: {}", e)))?;
        self.parse_response(parsed)
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<ChatResponse> {
        let mut body = self.build_request(&request);
        body.stream = true;
        let response = self.post(&body).await?;

        let mut out = ChatResponse {
            model: self.model.clone(),
            ..Default::default()
        };
        let mut decoder = SseDecoder::default();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            for data in decoder.push(&chunk?) {
                if data == "[DONE]" {
                    continue;
                }
                let chunk = match serde_json::from_str::<OaiStreamChunk>(&data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(error = %e, data = %data, "skipping malformed stream chunk");
                        continue;
                    }
                };
                if let Some(model) = chunk.model {
                    out.model = model;
                }
                for choice in chunk.choices {
                    if let Some(delta) = choice.delta.content.filter(|d| !d.is_empty()) {
                        on_token(&delta);
                        out.content.push_str(&delta);
                    }
                    if choice.finish_reason.is_some() {
                        out.finish_reason = choice.finish_reason;
                    }
                }
            }
        }
        Ok(out)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_native_tools(&self) -> bool {
        self.native_tools
    }
}

// Request types
#[derive(Serialize)]
struct OaiRequest<'a> {
    model: &'a str,
    messages: Vec<OaiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OaiTool<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct OaiMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OaiToolCallOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> OaiMessage<'a> {
    fn from_domain(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_ref(),
            content: &msg.content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| OaiToolCallOut {
                    id: &call.id,
                    r#type: "function",
                    function: OaiFunctionOut {
                        name: &call.name,
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct OaiToolCallOut<'a> {
    id: &'a str,
    r#type: &'static str,
    function: OaiFunctionOut<'a>,
}

#[derive(Serialize)]
struct OaiFunctionOut<'a> {
    name: &'a str,
    arguments: String,
}

#[derive(Serialize)]
struct OaiTool<'a> {
    r#type: &'static str,
    function: &'a ToolDefinition,
}

impl<'a> OaiTool<'a> {
    fn from_domain(def: &'a ToolDefinition) -> Self {
        Self {
            r#type: "function",
            function: def,
        }
    }
}

// Response types
#[derive(Deserialize, Debug)]
struct OaiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OaiChoice>,
    #[serde(default)]
    usage: Option<OaiUsage>,
}

#[derive(Deserialize, Debug)]
struct OaiChoice {
    message: OaiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OaiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OaiToolCallIn>,
}

#[derive(Deserialize, Debug)]
struct OaiToolCallIn {
    id: String,
    function: OaiFunctionIn,
}

#[derive(Deserialize, Debug)]
struct OaiFunctionIn {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct OaiStreamChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OaiStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct OaiStreamChoice {
    #[serde(default)]
    delta: OaiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct OaiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Splits a server-sent event byte stream into `data:` payloads. Lines may
/// span chunk boundaries, including inside a multi-byte character.
#[derive(Debug, Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn push(
        &mut self,
        chunk: &[u8],
    ) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut payloads = vec![];
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim().strip_prefix("data:") {
                payloads.push(data.trim().to_string());
            }
        }
        payloads
    }
}

#[derive(Deserialize, Debug)]
struct OaiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(format!("{}/v1/", server.uri()), "test-key", "gpt-test", 5).unwrap()
    }

    #[tokio::test]
    async fn test_chat_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gpt-test", "temperature": 0.5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-test-0613",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(vec![Message::system("sys"), Message::user("hi")]).with_temperature(0.5);
        let response = client(&server).chat(request).await.unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(response.model, "gpt-test-0613");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().completion_tokens, 2);
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_chat_tool_calls_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"tools": [{"type": "function", "function": {"name": "calculator"}}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "calculator", "arguments": "{\"expression\":\"2+2\"}"}}]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let tools = vec![ToolDefinition {
            name: "calculator".to_string(),
            description: "math".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let response = client(&server).chat(ChatRequest::new(vec![Message::user("2+2?")]).with_tools(tools)).await.unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.model, "gpt-test");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "calculator");
        assert_eq!(response.tool_calls[0].arguments, json!({"expression": "2+2"}));
    }

    #[tokio::test]
    async fn test_chat_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client(&server).chat(ChatRequest::new(vec![Message::user("hi")])).await.unwrap_err();
        match err {
            AgentflowError::Llm(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server).chat(ChatRequest::new(vec![Message::user("hi")])).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_chat_stream_deltas() {
        let server = MockServer::start().await;
        let body = [
            r#"data: {"model":"gpt-test-0613","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"data: {"choices":[{"index":0,"delta":{"content":"FINAL_ANSWER: "}}]}"#,
            r#"data: {"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
            ": keep-alive",
            r#"data: {"choices":[{"index":0,"delta":{"content":"lo!"},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ]
        .map(|line| format!("{line}\n\n"))
        .concat();
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/event-stream").set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let mut deltas = vec![];
        let response = client(&server).chat_stream(ChatRequest::new(vec![Message::user("hi")]), &mut |d: &str| deltas.push(d.to_string())).await.unwrap();

        assert_eq!(deltas, vec!["FINAL_ANSWER: ", "Hel", "lo!"]);
        assert_eq!(response.content, "FINAL_ANSWER: Hello!");
        assert_eq!(response.model, "gpt-test-0613");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_chat_stream_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(500).set_body_string("overloaded")).mount(&server).await;

        let err = client(&server).chat_stream(ChatRequest::new(vec![Message::user("hi")]), &mut |_: &str| {}).await.unwrap_err();
        assert!(matches!(err, AgentflowError::Llm(msg) if msg.contains("overloaded")));
    }

    #[test]
    fn test_sse_decoder_split_chunks() {
        let mut decoder = SseDecoder::default();
        let text = "data: {\"a\":\"é\"}\n\ndata: [DONE]\n";
        let bytes = text.as_bytes();
        // split inside the two-byte 'é'
        let split = text.find('é').unwrap() + 1;

        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["{\"a\":\"é\"}", "[DONE]"]);
        assert!(decoder.push(b"data: partial").is_empty());
    }

    #[test]
    fn test_request_serializes_tool_turns() {
        let client = OpenAiClient::new("http://localhost", "k", "m", 5).unwrap();
        let request = ChatRequest::new(vec![
            Message::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "c1".to_string(),
                    name: "calculator".to_string(),
                    arguments: json!({"expression": "1+1"}),
                }],
            ),
            Message::tool("c1", "{\"result\":2}"),
        ]);
        let body = serde_json::to_value(client.build_request(&request)).unwrap();

        assert_eq!(body["messages"][0]["tool_calls"][0]["function"]["arguments"], "{\"expression\":\"1+1\"}");
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_call_id"], "c1");
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
        assert!(body.get("stream").is_none());
    }
}
