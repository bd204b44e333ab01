use std::sync::Arc;

use crate::{
    Engine, Result,
    config::Config,
    llm::{self, LlmClient},
    runtime::Services,
    store::Store,
    tools::{Tool, ToolRegistry},
};

pub struct EngineBuilder {
    config: Config,
    llm: Option<Arc<dyn LlmClient>>,
    tools: ToolRegistry,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            llm: None,
            tools: ToolRegistry::with_builtins(),
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Use this client instead of one created from the `llm` config section.
    pub fn llm(
        mut self,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Register an additional tool next to the built-in ones.
    pub fn tool(
        mut self,
        tool: impl Tool,
    ) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let llm = match self.llm {
            Some(llm) => llm,
            None => llm::create_client(&self.config.llm)?,
        };
        let store = Store::from_config(&self.config.store)?;
        let services = Services::new(self.config, llm, self.tools);

        Ok(Engine::new(services, store))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        AgentflowError,
        config::{LlmProvider, StoreType},
        llm::mock::ScriptedLlm,
    };

    #[test]
    fn test_build_with_client() {
        let engine = EngineBuilder::new().llm(Arc::new(ScriptedLlm::new(["hi"]))).build().unwrap();
        assert_eq!(engine.config().store.store_type, StoreType::Mem);
        assert!(engine.tools().contains(&"calculator".to_string()));
    }

    #[test]
    fn test_build_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.store_type = StoreType::File;
        config.store.path = dir.path().join("data").to_string_lossy().to_string();
        let engine = EngineBuilder::new().config(config).llm(Arc::new(ScriptedLlm::new(["hi"]))).build().unwrap();
        assert!(engine.workflows().unwrap().is_empty());
    }

    #[test]
    fn test_build_without_api_key() {
        let mut config = Config::default();
        config.llm.provider = LlmProvider::Openai;
        config.llm.api_key = None;
        let err = EngineBuilder::new().config(config).build().err().unwrap();
        assert!(matches!(err, AgentflowError::Config(_)));
    }
}
