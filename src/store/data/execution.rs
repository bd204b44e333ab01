use crate::{
    store::{DbCollectionIden, DbDocument, StoreIden},
    workflow::WorkflowExecution,
};

impl DbCollectionIden for WorkflowExecution {
    fn iden() -> StoreIden {
        StoreIden::Executions
    }
}

impl DbDocument for WorkflowExecution {
    fn id(&self) -> &str {
        &self.id
    }
}
