//! Sled-based storage for tasks.

use crate::task::{NewTask, SortOrder, StatusFilter, Task, TaskPatch};
use chrono::Utc;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Todo not found: {0}")]
    NotFound(String),
}

/// Sled-based task store.
///
/// Tasks are stored as JSON keyed by a sled-generated id, so key order
/// follows creation order.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open a throwaway in-memory store, removed on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Create a task and return it as stored
    pub fn create(&self, new: NewTask) -> Result<Task, StorageError> {
        let id = format!("{:016x}", self.db.generate_id()?);
        let task = Task::from_new(id, new, Utc::now());
        self.write(&task)?;
        Ok(task)
    }

    /// Retrieve a task by id
    pub fn get(&self, id: &str) -> Result<Option<Task>, StorageError> {
        match self.db.get(id.as_bytes())? {
            Some(data) => {
                let task: Task = serde_json::from_slice(&data)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update, failing with `NotFound` for unknown ids
    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, StorageError> {
        let mut task = self
            .get(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        task.apply(patch, Utc::now());
        self.write(&task)?;
        Ok(task)
    }

    /// List all tasks, newest first
    pub fn list_all(&self) -> Result<Vec<Task>, StorageError> {
        self.list(StatusFilter::All, SortOrder::NewestFirst)
    }

    /// List tasks matching `status`, ordered by `sort`
    pub fn list(&self, status: StatusFilter, sort: SortOrder) -> Result<Vec<Task>, StorageError> {
        let mut results = self.scan(|task| status.matches(task))?;
        sort.sort(&mut results);
        Ok(results)
    }

    /// Tasks not yet completed, optionally scoped to one user.
    ///
    /// Order is not meaningful to callers.
    pub fn pending(&self, user_id: Option<&str>) -> Result<Vec<Task>, StorageError> {
        self.scan(|task| {
            task.is_pending() && user_id.is_none_or(|user| task.user_id.as_deref() == Some(user))
        })
    }

    /// Delete a task by id
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let existed = self.db.remove(id.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }

    /// Get the number of stored tasks
    pub fn count(&self) -> usize {
        self.db.len()
    }

    fn write(&self, task: &Task) -> Result<(), StorageError> {
        let value = serde_json::to_vec(task)?;
        self.db.insert(task.id.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn scan(&self, keep: impl Fn(&Task) -> bool) -> Result<Vec<Task>, StorageError> {
        let mut results = Vec::new();
        for item in self.db.iter() {
            let (_key, value) = item?;
            let task: Task = serde_json::from_slice(&value)?;
            if keep(&task) {
                results.push(task);
            }
        }
        Ok(results)
    }
}
