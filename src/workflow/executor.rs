//! Depth-first workflow execution.

use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

use chrono::Utc;
use futures::{FutureExt, future::BoxFuture};
use tracing::{debug, error, info};

use crate::{
    AgentflowError, Result, ShareLock,
    events::{GraphEvent, NodeEvent, WorkflowEvent, WorkflowFailedEvent, WorkflowStartEvent},
    runtime::Context,
    workflow::{
        Workflow,
        actions::ActionOutput,
        edge::SourceHandle,
        execution::{ExecutionStatus, NodeExecutionLog, WorkflowExecution},
        node::{Node, NodeExecutionStatus, NodeId},
    },
};

/// Runs one workflow once, starting at its trigger node.
///
/// Each branch carries its own copy of the visited set: a node already on the
/// current path is skipped, while a node reached through two different paths
/// runs once per path. Branches share the execution context.
pub struct WorkflowExecutor {
    workflow: Workflow,
    ctx: Arc<Context>,
    logs: ShareLock<Vec<NodeExecutionLog>>,
}

impl WorkflowExecutor {
    pub fn new(
        workflow: Workflow,
        ctx: Arc<Context>,
    ) -> Self {
        Self {
            workflow,
            ctx,
            logs: Arc::new(RwLock::new(vec![])),
        }
    }

    pub async fn execute(self) -> WorkflowExecution {
        let started_at = Utc::now();
        let eid = self.ctx.eid();
        info!(eid = %eid, workflow = %self.workflow.id(), "workflow execution started");
        self.ctx.emit(
            NodeId::new(),
            GraphEvent::Workflow(WorkflowEvent::Start(WorkflowStartEvent {
                workflow_id: self.workflow.id().to_string(),
                node_ids: self.workflow.get_all_node_ids(),
            })),
        );

        let trigger = self.workflow.trigger_node().id.clone();
        let result = self.visit(trigger, HashSet::new()).await;

        let (status, error) = match result {
            Ok(()) => {
                info!(eid = %eid, "workflow execution succeeded");
                self.ctx.emit(NodeId::new(), GraphEvent::Workflow(WorkflowEvent::Succeeded));
                (ExecutionStatus::Success, None)
            }
            Err(e) => {
                error!(eid = %eid, error = %e, "workflow execution failed");
                self.ctx.emit(
                    NodeId::new(),
                    GraphEvent::Workflow(WorkflowEvent::Failed(WorkflowFailedEvent {
                        error: e.to_string(),
                    })),
                );
                (ExecutionStatus::Error, Some(e.to_string()))
            }
        };

        let logs = std::mem::take(&mut *self.logs.write().unwrap_or_else(|e| e.into_inner()));
        WorkflowExecution {
            id: eid,
            workflow_id: self.workflow.id().to_string(),
            status,
            trigger_data: self.ctx.trigger().cloned(),
            logs,
            context: self.ctx.vars(),
            error,
            started_at,
            finished_at: Some(Utc::now()),
        }
    }

    fn visit(
        &self,
        nid: NodeId,
        mut visited: HashSet<NodeId>,
    ) -> BoxFuture<'_, Result<()>> {
        async move {
            let node = self.workflow.get_node(&nid).ok_or_else(|| AgentflowError::Node(format!("node {} not found", nid)))?;

            if !visited.insert(nid.clone()) {
                self.skip(node);
                return Ok(());
            }

            let output = self.run_node(node).await?;
            for edge in self.workflow.get_outgoing_edges(&nid) {
                if let Some(branch) = output.branch
                    && edge.source_handle != SourceHandle::Fixed(branch)
                {
                    continue;
                }
                self.visit(edge.target.clone(), visited.clone()).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn run_node(
        &self,
        node: &Node,
    ) -> Result<ActionOutput> {
        let start_time = Utc::now();
        debug!(node = %node.id, kind = %node.kind, "node running");
        self.ctx.emit(node.id.clone(), GraphEvent::Node(NodeEvent::Running(start_time.timestamp_millis())));

        let result = node.action.run(self.ctx.clone(), node.id.clone()).await;
        let end_time = Utc::now();

        match result {
            Ok(output) => {
                self.ctx.add_output(&node.id, &node.label, output.outputs.clone());
                debug!(node = %node.id, "node succeeded");
                self.ctx.emit(node.id.clone(), GraphEvent::Node(NodeEvent::Succeeded(end_time.timestamp_millis())));
                self.push_log(NodeExecutionLog {
                    node_id: node.id.clone(),
                    node_type: node.kind.clone(),
                    label: node.label.clone(),
                    status: NodeExecutionStatus::Success,
                    output: Some(output.outputs.clone()),
                    error: None,
                    start_time,
                    end_time: Some(end_time),
                });
                Ok(output)
            }
            Err(e) => {
                error!(node = %node.id, error = %e, "node failed");
                self.ctx.emit_log(node.id.clone(), e.to_string());
                self.ctx.emit(node.id.clone(), GraphEvent::Node(NodeEvent::Error(e.to_string())));
                self.push_log(NodeExecutionLog {
                    node_id: node.id.clone(),
                    node_type: node.kind.clone(),
                    label: node.label.clone(),
                    status: NodeExecutionStatus::Error,
                    output: None,
                    error: Some(e.to_string()),
                    start_time,
                    end_time: Some(end_time),
                });
                Err(e)
            }
        }
    }

    fn skip(
        &self,
        node: &Node,
    ) {
        debug!(node = %node.id, "node already on this path, skipped");
        self.ctx.emit(node.id.clone(), GraphEvent::Node(NodeEvent::Skipped));
        self.push_log(NodeExecutionLog {
            node_id: node.id.clone(),
            node_type: node.kind.clone(),
            label: node.label.clone(),
            status: NodeExecutionStatus::Skipped,
            output: None,
            error: None,
            start_time: Utc::now(),
            end_time: None,
        });
    }

    fn push_log(
        &self,
        log: NodeExecutionLog,
    ) {
        self.logs.write().unwrap_or_else(|e| e.into_inner()).push(log);
    }
}
