//! Chat-style conversations with an agent, backed by session memory.

mod event;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use crate::{
    Result,
    agents::{self, AgentRequest, GENERALIST, ToolInvocation},
    events::GraphEvent,
    llm::Message,
    memory::SessionSummary,
    runtime::{Channel, ChannelEvent, ChannelOptions, Context, Services},
    utils,
};

pub use event::ConversationEvent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub message: String,
    /// continue this conversation; a new one is started when absent
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// agent answering the message, `generalist` by default
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl ConversationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_conversation(
        mut self,
        conversation_id: impl Into<String>,
    ) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReply {
    pub conversation_id: String,
    pub output: String,
    pub iterations: usize,
    pub tool_calls: Vec<ToolInvocation>,
}

#[derive(Clone)]
pub struct ConversationService {
    services: Arc<Services>,
    channel: Arc<Channel>,
}

impl ConversationService {
    pub fn new(
        services: Arc<Services>,
        channel: Arc<Channel>,
    ) -> Self {
        Self {
            services,
            channel,
        }
    }

    /// Answer one message and wait for the reply.
    pub async fn send(
        &self,
        request: ConversationRequest,
    ) -> Result<ConversationReply> {
        let conversation_id = self.session_id(&request);
        run(self.services.clone(), self.channel.clone(), &request, conversation_id, false).await
    }

    /// Answer one message, reporting progress as a stream of events.
    ///
    /// The stream starts with `conversationId` and ends with `done` or `error`.
    pub fn stream(
        &self,
        request: ConversationRequest,
    ) -> UnboundedReceiverStream<ConversationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conversation_id = self.session_id(&request);
        let services = self.services.clone();
        let shared = self.channel.clone();

        tokio::spawn(async move {
            let _ = tx.send(ConversationEvent::ConversationId {
                conversation_id: conversation_id.clone(),
            });

            // per-run channel: agent events become frames and are also forwarded
            let channel = Arc::new(Channel::new());
            match ChannelEvent::channel(channel.clone(), ChannelOptions::default()) {
                Ok(events) => {
                    let frames = tx.clone();
                    events.on_event(move |e| {
                        if let GraphEvent::Agent(agent_event) = &e.event
                            && let Some(frame) = ConversationEvent::from_agent(agent_event)
                        {
                            let _ = frames.send(frame);
                        }
                        shared.emit(e.inner().clone());
                    });
                }
                Err(e) => warn!(error = %e, "conversation events unavailable"),
            }

            let frame = match run(services, channel, &request, conversation_id, true).await {
                Ok(reply) => ConversationEvent::Done {
                    conversation_id: reply.conversation_id,
                    output: reply.output,
                    iterations: reply.iterations,
                },
                Err(e) => ConversationEvent::Error {
                    error: e.to_string(),
                },
            };
            let _ = tx.send(frame);
        });

        UnboundedReceiverStream::new(rx)
    }

    /// Messages of a conversation, `None` when it does not exist or expired.
    pub fn history(
        &self,
        conversation_id: &str,
    ) -> Option<Vec<Message>> {
        self.services.memory.get(conversation_id).map(|s| s.messages)
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.services.memory.list()
    }

    pub fn delete(
        &self,
        conversation_id: &str,
    ) -> bool {
        self.services.memory.delete(conversation_id)
    }

    fn session_id(
        &self,
        request: &ConversationRequest,
    ) -> String {
        match &request.conversation_id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => self.services.memory.create().id,
        }
    }
}

async fn run(
    services: Arc<Services>,
    channel: Arc<Channel>,
    request: &ConversationRequest,
    conversation_id: String,
    stream: bool,
) -> Result<ConversationReply> {
    let agent_id = request.agent_id.clone().unwrap_or_else(|| GENERALIST.to_string());
    info!(conversation = %conversation_id, agent = %agent_id, "conversation message");

    let ctx = Context::new(utils::longid(), None, services, channel);
    let mut agent_request = AgentRequest::new(agent_id.clone(), request.message.clone()).with_session(conversation_id.clone());
    agent_request.stream = stream;
    let result = agents::run_agent(&ctx, &agent_id, &agent_request).await?;

    Ok(ConversationReply {
        conversation_id,
        output: result.output,
        iterations: result.iterations,
        tool_calls: result.tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;
    use crate::{
        config::Config,
        llm::{Role, mock::ScriptedLlm},
        tools::ToolRegistry,
    };

    fn service(llm: ScriptedLlm) -> ConversationService {
        let services = Arc::new(Services::new(Config::default(), Arc::new(llm), ToolRegistry::with_builtins()));
        ConversationService::new(services, Arc::new(Channel::new()))
    }

    #[tokio::test]
    async fn test_send_keeps_history() {
        let service = service(ScriptedLlm::new(["FINAL_ANSWER: Hello Ann", "FINAL_ANSWER: Your name is Ann"]));

        let first = service.send(ConversationRequest::new("I am Ann")).await.unwrap();
        let second = service.send(ConversationRequest::new("Who am I?").with_conversation(first.conversation_id.clone())).await.unwrap();

        assert_eq!(second.conversation_id, first.conversation_id);
        assert_eq!(second.output, "Your name is Ann");
        let history = service.history(&first.conversation_id).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[3].content, "Your name is Ann");
        assert_eq!(service.list().len(), 1);

        assert!(service.delete(&first.conversation_id));
        assert!(service.history(&first.conversation_id).is_none());
    }

    #[tokio::test]
    async fn test_stream_frames() {
        let service = service(ScriptedLlm::new(["USE_TOOL: calculator\nPARAMETERS: {\"expression\":\"2+2\"}", "FINAL_ANSWER: 4"]));

        let frames: Vec<ConversationEvent> = service.stream(ConversationRequest::new("2+2?")).collect().await;
        let names: Vec<_> = frames.iter().map(|f| f.name()).collect();

        assert_eq!(
            names,
            vec!["conversationId", "iteration", "status", "tool_start", "tool_result", "iteration", "status", "token", "done"]
        );
        assert!(matches!(frames.last(), Some(ConversationEvent::Done { output, .. }) if output == "4"));
    }

    #[tokio::test]
    async fn test_stream_answer_in_pieces() {
        let service = service(ScriptedLlm::new(["FINAL_ANSWER: Cats sleep most of the day."]).chunked(4));

        let frames: Vec<ConversationEvent> = service.stream(ConversationRequest::new("Tell me about cats")).collect().await;
        let tokens: Vec<&str> = frames
            .iter()
            .filter_map(|f| match f {
                ConversationEvent::Token {
                    content,
                } => Some(content.as_str()),
                _ => None,
            })
            .collect();

        assert!(tokens.len() > 3);
        assert_eq!(tokens.concat(), "Cats sleep most of the day.");
        assert_eq!(frames.iter().rev().nth(1).map(|f| f.name()), Some("token"));
        assert!(matches!(frames.last(), Some(ConversationEvent::Done { output, .. }) if output == "Cats sleep most of the day."));
    }

    #[tokio::test]
    async fn test_stream_error_frame() {
        let service = service(ScriptedLlm::new(Vec::<String>::new()));
        let frames: Vec<ConversationEvent> = service.stream(ConversationRequest::new("hi")).collect().await;
        assert_eq!(frames.last().map(|f| f.name()), Some("error"));
        assert!(frames.last().unwrap().is_terminal());
    }
}
