mod collect;

use std::sync::Arc;

use crate::{
    store::{DbCollection, DbStore, Store, data::Workflow},
    workflow::WorkflowExecution,
};
pub use collect::Collect;

#[derive(Debug, Clone)]
pub struct MemStore {
    workflows: Arc<Collect<Workflow>>,
    executions: Arc<Collect<WorkflowExecution>>,
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.workflows());
        s.register(self.executions());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(Collect::new("workflows")),
            executions: Arc::new(Collect::new("executions")),
        }
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow> + Send + Sync> {
        self.workflows.clone()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = WorkflowExecution> + Send + Sync> {
        self.executions.clone()
    }
}
