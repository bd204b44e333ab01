use crate::workflow::node::NodeId;

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    Start(WorkflowStartEvent),
    Succeeded,
    Failed(WorkflowFailedEvent),
}

impl WorkflowEvent {
    pub fn str(&self) -> &str {
        match self {
            WorkflowEvent::Start(_) => "Running",
            WorkflowEvent::Succeeded => "Succeeded",
            WorkflowEvent::Failed(_) => "Failed",
        }
    }
}

/// Event emitted when a workflow starts
#[derive(Debug, Clone)]
pub struct WorkflowStartEvent {
    /// Workflow being executed
    pub workflow_id: String,
    /// All node IDs in the workflow
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct WorkflowFailedEvent {
    pub error: String,
}
