//! Error types for Agentflow.
//!
//! All errors in Agentflow are represented by the `AgentflowError` enum,
//! which provides specific variants for different error categories.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Agentflow operations.
///
/// Each variant represents a specific category of error that can occur
/// during workflow definition, execution, model calls or storage operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum AgentflowError {
    /// Engine-level errors (startup, wiring, missing services).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML, etc.).
    #[error("{0}")]
    Convert(String),

    /// Workflow definition errors.
    #[error("{0}")]
    Workflow(String),

    /// Node definition or execution errors.
    #[error("{0}")]
    Node(String),

    /// Edge definition errors.
    #[error("{0}")]
    Edge(String),

    /// Action execution errors.
    #[error("{0}")]
    Action(String),

    /// Model provider errors (HTTP failures, malformed responses).
    #[error("llm error: {0}")]
    Llm(String),

    /// Tool lookup or execution errors.
    #[error("tool error: {0}")]
    Tool(String),

    /// Agent registry or agent run errors.
    #[error("agent error: {0}")]
    Agent(String),

    /// Chain formatting or routing errors.
    #[error("chain error: {0}")]
    Chain(String),

    /// The tool-calling loop ran out of iterations.
    #[error("Max iterations reached ({0})")]
    MaxIterations(usize),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<AgentflowError> for String {
    fn from(val: AgentflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for AgentflowError {
    fn from(error: std::io::Error) -> Self {
        AgentflowError::IoError(error.to_string())
    }
}

impl From<AgentflowError> for std::io::Error {
    fn from(val: AgentflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for AgentflowError {
    fn from(error: serde_json::Error) -> Self {
        AgentflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for AgentflowError {
    fn from(error: toml::de::Error) -> Self {
        AgentflowError::Config(error.to_string())
    }
}

impl From<reqwest::Error> for AgentflowError {
    fn from(error: reqwest::Error) -> Self {
        AgentflowError::Llm(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for AgentflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        AgentflowError::Node(error.to_string())
    }
}
