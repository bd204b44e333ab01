use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::{AgentflowError, Result, ShareLock};

pub const GENERALIST: &str = "generalist";
pub const SUPERVISOR: &str = "supervisor";

/// Static description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    /// names of the tools this agent may call
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// set for agents added at runtime
    #[serde(default)]
    pub custom: bool,
}

fn default_temperature() -> f32 {
    0.7
}

fn builtin(
    id: &str,
    name: &str,
    description: &str,
    system_prompt: &str,
    tools: &[&str],
    temperature: f32,
) -> AgentDefinition {
    AgentDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        system_prompt: system_prompt.to_string(),
        tools: tools.iter().map(|t| t.to_string()).collect(),
        temperature,
        custom: false,
    }
}

fn builtins() -> Vec<AgentDefinition> {
    vec![
        builtin(
            GENERALIST,
            "Generalist",
            "Handles general questions and everyday tasks.",
            "You are a helpful, knowledgeable assistant. Answer clearly and accurately, and use tools when they help.",
            &["calculator", "current_time", "word_count", "http_get"],
            0.7,
        ),
        builtin(
            "researcher",
            "Researcher",
            "Gathers facts and background information on a topic.",
            "You are a meticulous researcher. Gather relevant facts, cite what you found and separate facts from assumptions.",
            &["http_get", "current_time"],
            0.3,
        ),
        builtin(
            "analyst",
            "Analyst",
            "Analyses data, performs calculations and draws conclusions.",
            "You are a precise analyst. Break problems into steps, show your reasoning and verify every number with the calculator.",
            &["calculator", "word_count"],
            0.2,
        ),
        builtin(
            "writer",
            "Writer",
            "Writes and edits clear, engaging prose.",
            "You are a skilled writer. Produce well-structured, engaging text tailored to the requested audience and tone.",
            &["word_count"],
            0.8,
        ),
        builtin(
            SUPERVISOR,
            "Supervisor",
            "Selects which agents handle a task and how they run.",
            "You coordinate a team of specialist agents. Given a task and the available agents, decide which agents should work on it, \
             whether they should run in parallel or sequentially, and what sub-task each one gets. Respond with JSON only.",
            &[],
            0.2,
        ),
    ]
}

/// Built-in agents plus agents registered at runtime.
#[derive(Clone)]
pub struct AgentRegistry {
    agents: ShareLock<HashMap<String, AgentDefinition>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    /// Registry pre-populated with the built-in agents.
    pub fn new() -> Self {
        let agents = builtins().into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            agents: Arc::new(RwLock::new(agents)),
        }
    }

    /// Add or replace a custom agent. Built-in ids cannot be shadowed.
    pub fn register(
        &self,
        mut agent: AgentDefinition,
    ) -> Result<()> {
        if agent.id.trim().is_empty() {
            return Err(AgentflowError::Agent("agent id must not be empty".to_string()));
        }

        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        if agents.get(&agent.id).is_some_and(|a| !a.custom) {
            return Err(AgentflowError::Agent(format!("cannot override built-in agent '{}'", agent.id)));
        }

        agent.custom = true;
        agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    /// Remove a custom agent. Returns whether it existed.
    pub fn remove(
        &self,
        id: &str,
    ) -> Result<bool> {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        match agents.get(id) {
            Some(a) if !a.custom => Err(AgentflowError::Agent(format!("cannot remove built-in agent '{}'", id))),
            Some(_) => Ok(agents.remove(id).is_some()),
            None => Ok(false),
        }
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<AgentDefinition> {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).contains_key(id)
    }

    /// All agents sorted by id.
    pub fn list(&self) -> Vec<AgentDefinition> {
        let mut agents: Vec<AgentDefinition> = self.agents.read().unwrap_or_else(|e| e.into_inner()).values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }
}
