use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::{
    AgentflowError, Result, ShareLock,
    store::{DbCollection, DbDocument},
};

/// In-memory collection keeping records in insertion order.
#[derive(Debug, Clone)]
pub struct Collect<T> {
    name: String,
    items: ShareLock<Vec<T>>,
}

impl<T> Collect<T>
where
    T: DbDocument,
{
    pub fn new(name: &str) -> Self {
        Self::with_items(name, vec![])
    }

    pub fn with_items(
        name: &str,
        items: Vec<T>,
    ) -> Self {
        Self {
            name: name.to_string(),
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Replace every record, e.g. to undo a change that could not be persisted.
    pub fn restore(
        &self,
        items: Vec<T>,
    ) {
        *self.items.write().unwrap_or_else(|e| e.into_inner()) = items;
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.iter().any(|item| item.id() == id))
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        trace!("{}::find({})", self.name, id);
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| AgentflowError::Store(format!("{} not found in {}", id, self.name)))
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        Ok(self.items.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::create({})", self.name, data.id());
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        if items.iter().any(|item| item.id() == data.id()) {
            return Err(AgentflowError::Store(format!("{} already exists in {}", data.id(), self.name)));
        }
        items.push(data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        trace!("{}::update({})", self.name, data.id());
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        match items.iter_mut().find(|item| item.id() == data.id()) {
            Some(item) => {
                *item = data.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        trace!("{}::delete({})", self.name, id);
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        let len = items.len();
        items.retain(|item| item.id() != id);
        Ok(items.len() != len)
    }
}
