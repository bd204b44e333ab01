use serde::{Deserialize, Serialize};

use crate::{
    WorkflowModel,
    store::{DbCollectionIden, DbDocument, StoreIden},
};

/// Stored workflow: the definition plus bookkeeping timestamps (milliseconds).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(flatten)]
    pub model: WorkflowModel,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub update_time: i64,
}

impl DbCollectionIden for Workflow {
    fn iden() -> StoreIden {
        StoreIden::Workflows
    }
}

impl DbDocument for Workflow {
    fn id(&self) -> &str {
        &self.model.id
    }
}
