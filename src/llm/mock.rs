//! Scripted chat model for tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    AgentflowError, Result,
    llm::{ChatRequest, ChatResponse, LlmClient},
};

type Responder = Arc<dyn Fn(&ChatRequest) -> Result<ChatResponse> + Send + Sync>;

/// Replies from a fixed script in order, or from a closure that inspects the
/// request. Every request is recorded for later assertions.
pub(crate) struct ScriptedLlm {
    script: Mutex<VecDeque<ChatResponse>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
    native_tools: bool,
    chunk_size: usize,
}

impl ScriptedLlm {
    pub(crate) fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_responses(responses.into_iter().map(|s| ChatResponse::text(s)))
    }

    pub(crate) fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = ChatResponse>,
    {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            responder: None,
            requests: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
            native_tools: false,
            chunk_size: 0,
        }
    }

    pub(crate) fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ChatResponse> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Arc::new(f)),
            requests: Mutex::new(vec![]),
            calls: AtomicUsize::new(0),
            native_tools: false,
            chunk_size: 0,
        }
    }

    pub(crate) fn native_tools(mut self) -> Self {
        self.native_tools = true;
        self
    }

    /// Stream replies as deltas of `size` characters.
    pub(crate) fn chunked(
        mut self,
        size: usize,
    ) -> Self {
        self.chunk_size = size;
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(responder) = &self.responder {
            return responder(&request);
        }
        self.script.lock().unwrap().pop_front().ok_or_else(|| AgentflowError::Llm("script exhausted".to_string()))
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<ChatResponse> {
        let response = self.chat(request).await?;
        let chars: Vec<char> = response.content.chars().collect();
        let size = if self.chunk_size == 0 { chars.len().max(1) } else { self.chunk_size };
        for piece in chars.chunks(size) {
            on_token(&piece.iter().collect::<String>());
        }
        Ok(response)
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn supports_native_tools(&self) -> bool {
        self.native_tools
    }
}

/// Text of the last user turn of a request.
pub(crate) fn last_user_text(request: &ChatRequest) -> String {
    request.messages.iter().rev().find(|m| m.role == crate::llm::Role::User).map(|m| m.content.clone()).unwrap_or_default()
}

/// Text of the system turn of a request.
pub(crate) fn system_text(request: &ChatRequest) -> String {
    request.messages.iter().find(|m| m.role == crate::llm::Role::System).map(|m| m.content.clone()).unwrap_or_default()
}
