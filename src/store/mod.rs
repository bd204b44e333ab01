//! Storage layer for workflow definitions and executions.
//!
//! Provides an abstraction over different storage backends:
//! - `MemStore`: everything in memory
//! - `FileStore`: workflows in a JSON array file, executions in memory

pub mod data;
mod db;
mod store;

use std::error::Error;

use strum::AsRefStr;

use crate::{AgentflowError, Result};

pub use db::{FileStore, MemStore};
pub use store::Store;

/// Maps backend errors to AgentflowError.
fn map_db_err(err: impl Error) -> AgentflowError {
    AgentflowError::Store(err.to_string())
}

/// Collection keys; each record type lives in exactly one collection.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq)]
pub enum StoreIden {
    /// Workflow definitions.
    #[strum(serialize = "workflows")]
    Workflows,
    /// Finished workflow executions.
    #[strum(serialize = "executions")]
    Executions,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for records addressable by id.
pub trait DbDocument: Clone + Send + Sync {
    fn id(&self) -> &str;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// A backend that contributes collections to a [`Store`].
pub trait DbStore {
    fn init(
        &self,
        s: &Store,
    );
}
