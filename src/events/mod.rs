//! Event types for workflow execution.
//!
//! Events are emitted during workflow execution and agent runs to notify
//! subscribers about node progress, agent iterations, tool calls and logs.

mod agent;
mod node;
mod workflow;

pub use agent::*;
pub use node::*;
pub use workflow::*;

use crate::{runtime::ExecutionId, workflow::node::NodeId};

/// Event handed to channel handlers; derefs to the wrapped message or log.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// Top-level event type for workflow graph events.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// Workflow-level events (start, succeeded, failed).
    Workflow(WorkflowEvent),
    /// Node-level events (running, succeeded, skipped, error).
    Node(NodeEvent),
    /// Tool-calling loop events of an agent run.
    Agent(AgentEvent),
}

/// Event message containing execution and node context.
#[derive(Debug, Clone)]
pub struct Message {
    /// Execution ID that generated this event.
    pub eid: ExecutionId,
    /// Node ID that generated this event (empty for workflow events, the
    /// agent id for agents run outside a workflow).
    pub nid: NodeId,
    /// The actual event data.
    pub event: GraphEvent,
}

/// Log entry emitted during node execution.
#[derive(Debug, Clone)]
pub struct Log {
    /// Execution ID that generated this log.
    pub eid: ExecutionId,
    /// Node ID that generated this log.
    pub nid: NodeId,
    /// Log message content.
    pub content: String,
    /// Timestamp in milliseconds of the log entry.
    pub timestamp: i64,
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl GraphEvent {
    /// Short `scope:state` name such as `node:Succeeded` or `agent:tool_start`.
    pub fn name(&self) -> String {
        match self {
            GraphEvent::Workflow(e) => format!("workflow:{}", e.str()),
            GraphEvent::Node(e) => format!("node:{}", e.str()),
            GraphEvent::Agent(e) => format!("agent:{}", e.str()),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Succeeded))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GraphEvent::Workflow(WorkflowEvent::Failed(_)))
    }
}
