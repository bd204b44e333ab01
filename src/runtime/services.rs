use std::sync::Arc;

use crate::{agents::AgentRegistry, config::Config, llm::LlmClient, memory::ConversationStore, tools::ToolRegistry};

/// Collaborators shared by every execution of an engine.
pub struct Services {
    pub config: Config,
    pub llm: Arc<dyn LlmClient>,
    pub tools: Arc<ToolRegistry>,
    pub agents: Arc<AgentRegistry>,
    pub memory: Arc<ConversationStore>,
}

impl Services {
    pub fn new(
        config: Config,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
    ) -> Self {
        let memory = ConversationStore::new(&config.memory);
        Self {
            config,
            llm,
            tools: Arc::new(tools),
            agents: Arc::new(AgentRegistry::new()),
            memory: Arc::new(memory),
        }
    }
}
