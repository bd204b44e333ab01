//! # Agentflow
//!
//! Agentflow is an embeddable engine for LLM workflows and tool-using agents.
//! Workflows are JSON graphs of nodes that call a chat model, run prompt
//! chains, drive agents through a tool-calling loop, branch on conditions and
//! transform data. Every node's output is written into a shared context that
//! later nodes reference with `{{path}}` placeholders.
//!
//! ## Core Features
//!
//! - **Graph Execution**: depth-first from the trigger node, with `true`/`false` branches and cycle protection
//! - **Agents**: built-in and custom agents that call tools until they produce a final answer
//! - **Multi-Agent**: parallel, sequential and supervisor-planned runs over several agents
//! - **Chains**: prompt templates, sequential chains and router chains
//! - **Conversations**: per-session memory with streamed progress events
//! - **Event Channel**: subscribe to workflow, node and agent events by execution and node id
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::{Config, EngineBuilder, WorkflowModel};
//!
//! let engine = EngineBuilder::new().config(Config::from_env()?).build()?;
//!
//! // Deploy and run workflow
//! let workflow = WorkflowModel::from_json(json_str)?;
//! engine.deploy(&workflow)?;
//! let execution = engine.execute(&workflow.id, Some(json!({"topic": "owls"}))).await?;
//! ```

pub mod agents;
mod builder;
pub mod chains;
mod common;
pub mod config;
pub mod conversation;
mod engine;
mod error;
pub mod events;
pub mod llm;
pub mod logging;
pub mod memory;
mod model;
mod runtime;
mod store;
pub mod tools;
mod utils;
pub mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::Config;
pub use engine::Engine;
pub use error::AgentflowError;
pub use model::*;
pub use runtime::{ChannelEvent, ChannelOptions, ExecutionId};
pub use workflow::{ExecutionStatus, NodeExecutionLog, WorkflowExecution};

/// Result type alias for Agentflow operations.
pub type Result<T> = std::result::Result<T, AgentflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
