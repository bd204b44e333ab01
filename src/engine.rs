//! Workflow engine - the main entry point for Agentflow.
//!
//! The engine owns everything shared between executions:
//! - the model client, tool and agent registries and conversation memory
//! - the store holding workflow definitions and finished executions
//! - the event channel

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::{
    Result,
    agents::{self, AgentDefinition, AgentRequest, AgentResult, MultiAgentRequest, MultiAgentResult},
    config::Config,
    conversation::ConversationService,
    model::WorkflowModel,
    runtime::{Channel, Context, Services},
    store::Store,
    utils,
    workflow::{Workflow, WorkflowExecution, WorkflowExecutor},
};

/// The main workflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().config(Config::from_env()?).build()?;
///
/// // Deploy a workflow
/// engine.deploy(&workflow_model)?;
///
/// // Run it
/// let execution = engine.execute("workflow_id", Some(json!({"topic": "cats"}))).await?;
/// ```
pub struct Engine {
    /// Collaborators handed to every execution.
    services: Arc<Services>,
    /// Event channel for broadcasting execution events.
    channel: Arc<Channel>,
    /// Storage for workflows and executions.
    store: Arc<Store>,
    conversations: ConversationService,
}

impl Engine {
    pub(crate) fn new(
        services: Services,
        store: Store,
    ) -> Self {
        let services = Arc::new(services);
        let channel = Arc::new(Channel::new());
        Self {
            conversations: ConversationService::new(services.clone(), channel.clone()),
            services,
            channel,
            store: Arc::new(store),
        }
    }

    pub fn config(&self) -> &Config {
        &self.services.config
    }

    /// Validates and stores a workflow definition, replacing one with the same id.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        Workflow::try_from(workflow)?;
        self.store.deploy(workflow)
    }

    pub fn workflow(
        &self,
        wid: &str,
    ) -> Result<WorkflowModel> {
        Ok(self.store.workflows()?.find(wid)?.model)
    }

    pub fn workflows(&self) -> Result<Vec<WorkflowModel>> {
        Ok(self.store.workflows()?.list()?.into_iter().map(|w| w.model).collect())
    }

    pub fn remove_workflow(
        &self,
        wid: &str,
    ) -> Result<bool> {
        self.store.workflows()?.delete(wid)
    }

    /// Run a deployed workflow. A failed node makes the execution's status
    /// `error`; only a missing or invalid workflow is an `Err`.
    pub async fn execute(
        &self,
        wid: &str,
        trigger: Option<Value>,
    ) -> Result<WorkflowExecution> {
        let model = self.workflow(wid)?;
        self.execute_model(&model, trigger).await
    }

    /// Run a workflow definition without deploying it.
    pub async fn execute_model(
        &self,
        model: &WorkflowModel,
        trigger: Option<Value>,
    ) -> Result<WorkflowExecution> {
        let workflow = Workflow::try_from(model)?;
        let ctx = Arc::new(Context::new(utils::longid(), trigger, self.services.clone(), self.channel.clone()));
        info!(eid = %ctx.eid(), workflow = %model.id, "executing workflow");

        let execution = WorkflowExecutor::new(workflow, ctx).execute().await;
        self.store.executions()?.create(&execution)?;
        Ok(execution)
    }

    pub fn execution(
        &self,
        eid: &str,
    ) -> Result<WorkflowExecution> {
        self.store.executions()?.find(eid)
    }

    /// Stored executions, optionally only those of one workflow.
    pub fn executions(
        &self,
        wid: Option<&str>,
    ) -> Result<Vec<WorkflowExecution>> {
        let executions = self.store.executions()?.list()?;
        Ok(executions.into_iter().filter(|e| wid.is_none_or(|wid| e.workflow_id == wid)).collect())
    }

    /// Run one agent outside any workflow. Events use the agent id as node id.
    pub async fn run_agent(
        &self,
        request: &AgentRequest,
    ) -> Result<AgentResult> {
        let ctx = self.standalone_context();
        agents::run_agent(&ctx, &request.agent_id, request).await
    }

    pub async fn run_multi_agent(
        &self,
        request: &MultiAgentRequest,
    ) -> Result<MultiAgentResult> {
        let ctx = self.standalone_context();
        agents::run_multi(&ctx, "multi_agent", request).await
    }

    pub fn register_agent(
        &self,
        agent: AgentDefinition,
    ) -> Result<()> {
        self.services.agents.register(agent)
    }

    pub fn remove_agent(
        &self,
        id: &str,
    ) -> Result<bool> {
        self.services.agents.remove(id)
    }

    pub fn agents(&self) -> Vec<AgentDefinition> {
        self.services.agents.list()
    }

    /// Names of the registered tools.
    pub fn tools(&self) -> Vec<String> {
        self.services.tools.list().into_iter().map(|t| t.to_string()).collect()
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    fn standalone_context(&self) -> Context {
        Context::new(utils::longid(), None, self.services.clone(), self.channel.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::{
        AgentflowError, ChannelEvent, ChannelOptions, EngineBuilder,
        events::AgentEvent,
        llm::mock::ScriptedLlm,
        workflow::ExecutionStatus,
    };

    fn engine(llm: ScriptedLlm) -> Engine {
        EngineBuilder::new().llm(Arc::new(llm)).build().unwrap()
    }

    fn story() -> WorkflowModel {
        serde_json::from_value(json!({
            "id": "story",
            "name": "Story",
            "nodes": [
                {"id": "t", "type": "trigger", "label": "Trigger"},
                {"id": "w", "type": "llm", "label": "Writer", "config": {"prompt": "Write about {{trigger.topic}}"}}
            ],
            "edges": [{"id": "e1", "source": "t", "target": "w"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_deploy_and_execute() {
        let engine = engine(ScriptedLlm::new(["Cats!"]));
        engine.deploy(&story()).unwrap();
        assert_eq!(engine.workflows().unwrap().len(), 1);

        let execution = engine.execute("story", Some(json!({"topic": "cats"}))).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.context["writer"]["output"], "Cats!");

        assert_eq!(engine.execution(&execution.id).unwrap(), execution);
        assert_eq!(engine.executions(Some("story")).unwrap().len(), 1);
        assert!(engine.executions(Some("other")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_execution_is_stored() {
        let engine = engine(ScriptedLlm::new(Vec::<String>::new()));
        let execution = engine.execute_model(&story(), None).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Error);
        assert_eq!(engine.execution(&execution.id).unwrap().status, ExecutionStatus::Error);
    }

    #[test]
    fn test_deploy_rejects_invalid_workflow() {
        let engine = engine(ScriptedLlm::new(Vec::<String>::new()));
        let mut model = story();
        model.nodes.remove(0);
        assert!(matches!(engine.deploy(&model).unwrap_err(), AgentflowError::Workflow(_)));
        assert!(engine.workflows().unwrap().is_empty());
        assert!(engine.workflow("story").is_err());
    }

    #[tokio::test]
    async fn test_run_agent_emits_agent_events() {
        let engine = engine(ScriptedLlm::new(["FINAL_ANSWER: done"]));
        let seen = Arc::new(Mutex::new(vec![]));
        let s = seen.clone();
        ChannelEvent::channel(engine.channel(), ChannelOptions::with_nid("writer".to_string())).unwrap().on_agent(move |_, e: &AgentEvent| {
            s.lock().unwrap().push(e.str().to_string());
        });

        let result = engine.run_agent(&AgentRequest::new("writer", "Say done")).await.unwrap();
        assert_eq!(result.output, "done");
        assert_eq!(*seen.lock().unwrap(), vec!["iteration_start", "llm_start", "llm_end", "iteration_end"]);
    }

    #[test]
    fn test_custom_agents() {
        let engine = engine(ScriptedLlm::new(Vec::<String>::new()));
        let agent = AgentDefinition {
            id: "poet".to_string(),
            name: "Poet".to_string(),
            description: "writes verse".to_string(),
            system_prompt: "You write poems.".to_string(),
            tools: vec![],
            temperature: 0.9,
            custom: false,
        };
        engine.register_agent(agent).unwrap();
        assert!(engine.agents().iter().any(|a| a.id == "poet" && a.custom));
        assert!(engine.remove_agent("poet").unwrap());
        assert!(engine.remove_agent("writer").is_err());
        assert_eq!(engine.tools(), vec!["calculator", "current_time", "http_get", "word_count"]);
    }
}
