use std::{
    any::Any,
    collections::HashMap,
    convert::AsRef,
    sync::{Arc, RwLock},
};

use tracing::trace;

use crate::{
    AgentflowError, Result, ShareLock,
    config::{StoreConfig, StoreType},
    model::WorkflowModel,
    workflow::WorkflowExecution,
};

use super::{DbCollection, DbCollectionIden, DbStore, FileStore, MemStore, data::*};

#[derive(Clone)]
pub struct DynDbSetRef<T>(Arc<dyn DbCollection<Item = T>>);

pub struct Store {
    collections: ShareLock<HashMap<super::StoreIden, Arc<dyn Any + Send + Sync + 'static>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a store with the backend selected in config.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = Self::new();
        match config.store_type {
            StoreType::Mem => MemStore::new().init(&store),
            StoreType::File => FileStore::open(&config.path)?.init(&store),
        }
        Ok(store)
    }

    pub fn collection<DATA>(&self) -> Result<Arc<dyn DbCollection<Item = DATA>>>
    where
        DATA: DbCollectionIden + Send + Sync + 'static,
    {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        collections
            .get(&DATA::iden())
            .and_then(|collection| collection.downcast_ref::<DynDbSetRef<DATA>>())
            .map(|v| v.0.clone())
            .ok_or_else(|| AgentflowError::Store(format!("fail to get collection: {}", DATA::iden().as_ref())))
    }

    pub fn register<DATA>(
        &self,
        collection: Arc<dyn DbCollection<Item = DATA> + Send + Sync + 'static>,
    ) where
        DATA: DbCollectionIden + 'static,
    {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections.insert(DATA::iden(), Arc::new(DynDbSetRef::<DATA>(collection)));
    }

    pub fn workflows(&self) -> Result<Arc<dyn DbCollection<Item = Workflow>>> {
        self.collection()
    }

    pub fn executions(&self) -> Result<Arc<dyn DbCollection<Item = WorkflowExecution>>> {
        self.collection()
    }

    /// Create or replace a workflow definition. The creation time survives updates.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        trace!("store::deploy({})", workflow.id);
        if workflow.id.is_empty() {
            return Err(AgentflowError::Workflow("missing id in workflow".into()));
        }
        let workflows = self.workflows()?;
        let now = chrono::Utc::now().timestamp_millis();
        if workflows.exists(&workflow.id)? {
            let existing = workflows.find(&workflow.id)?;
            workflows.update(&Workflow {
                model: workflow.clone(),
                create_time: existing.create_time,
                update_time: now,
            })
        } else {
            workflows.create(&Workflow {
                model: workflow.clone(),
                create_time: now,
                update_time: 0,
            })
        }
    }
}
