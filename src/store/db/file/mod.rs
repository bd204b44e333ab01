//! Workflows persisted as a flat JSON array, rewritten on every change.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::{debug, info, warn};

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::Workflow, db::mem::Collect, map_db_err},
    workflow::WorkflowExecution,
};

/// Workflow collection mirrored to a JSON file.
pub struct FileCollect {
    path: PathBuf,
    inner: Collect<Workflow>,
    write_lock: Mutex<()>,
}

impl FileCollect {
    /// Load the file at `path`, or start empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items: Vec<Workflow> = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() { vec![] } else { serde_json::from_str(&text).map_err(map_db_err)? }
        } else {
            vec![]
        };
        info!(path = %path.display(), count = items.len(), "workflow file loaded");

        Ok(Self {
            path,
            inner: Collect::with_items("workflows", items),
            write_lock: Mutex::new(()),
        })
    }

    /// Apply `change` and write the file when it changed anything. The
    /// in-memory records are put back when the write fails.
    fn write(
        &self,
        change: impl FnOnce(&Collect<Workflow>) -> Result<bool>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let before = self.inner.list()?;
        if !change(&self.inner)? {
            return Ok(false);
        }
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "workflow file write failed, change reverted");
            self.inner.restore(before);
            return Err(e);
        }
        Ok(true)
    }

    fn flush(&self) -> Result<()> {
        let items = self.inner.list()?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&items)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = items.len(), "workflow file written");
        Ok(())
    }
}

impl DbCollection for FileCollect {
    type Item = Workflow;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        self.inner.exists(id)
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item> {
        self.inner.find(id)
    }

    fn list(&self) -> Result<Vec<Self::Item>> {
        self.inner.list()
    }

    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        self.write(|inner| inner.create(data))
    }

    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool> {
        self.write(|inner| inner.update(data))
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        self.write(|inner| inner.delete(id))
    }
}

/// Workflows on disk, executions in memory.
#[derive(Clone)]
pub struct FileStore {
    workflows: Arc<FileCollect>,
    executions: Arc<Collect<WorkflowExecution>>,
}

impl DbStore for FileStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register::<Workflow>(self.workflows.clone());
        s.register::<WorkflowExecution>(self.executions.clone());
    }
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            workflows: Arc::new(FileCollect::open(path)?),
            executions: Arc::new(Collect::new("executions")),
        })
    }
}
