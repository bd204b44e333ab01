//! Tools callable by agents, either through the text-marker protocol or through
//! native tool calls.

mod calculator;
mod clock;
mod http_get;
mod word_count;

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use crate::{AgentflowError, Result, llm::ToolDefinition};

pub use calculator::CalculatorTool;
pub use clock::CurrentTimeTool;
pub use http_get::HttpGetTool;
pub use word_count::WordCountTool;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Tool name as the model refers to it. Must match `\w+`.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    async fn execute(
        &self,
        input: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Timeout in seconds for one call.
    fn timeout_secs(&self) -> u64 {
        30
    }
}

/// Registry of available tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in tools registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CalculatorTool);
        registry.register(CurrentTimeTool);
        registry.register(WordCountTool);
        registry.register(HttpGetTool::new());
        registry
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(
        &mut self,
        tool: impl Tool,
    ) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name.
    pub fn get(
        &self,
        name: &str,
    ) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted tool names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Definitions for the named tools, in the given order. Unknown names are skipped.
    pub fn definitions(
        &self,
        names: &[String],
    ) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name, bounded by the tool's timeout.
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let tool = self.get(name).ok_or_else(|| AgentflowError::Tool(format!("tool '{}' not found", name)))?;
        debug!(tool = name, %input, "executing tool");

        let timeout = Duration::from_secs(tool.timeout_secs());
        match tokio::time::timeout(timeout, tool.execute(input)).await {
            Ok(result) => result,
            Err(_) => Err(AgentflowError::Tool(format!("tool '{}' timed out after {}s", name, tool.timeout_secs()))),
        }
    }
}
