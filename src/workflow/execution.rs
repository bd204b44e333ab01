use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    runtime::ExecutionId,
    workflow::node::{NodeExecutionStatus, NodeId},
};

/// Overall status of an execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Running,
    Success,
    Error,
}

/// Record of one node visit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionLog {
    pub node_id: NodeId,
    pub node_type: String,
    pub label: String,
    pub status: NodeExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Result of running a workflow once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
    /// node logs in visit order
    pub logs: Vec<NodeExecutionLog>,
    /// final variable map
    pub context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// The latest log of a node.
    pub fn node_log(
        &self,
        nid: &str,
    ) -> Option<&NodeExecutionLog> {
        self.logs.iter().rev().find(|log| log.node_id == nid)
    }
}
