//! Task data stores
//!
//! A store maps task ids to serialized task data. The lifecycle never talks
//! to a store directly; the session loads tasks through one and writes the
//! modified ones back on finish.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Task not found in store: {0}")]
    TaskNotFound(String),
}

/// Persistent key/value storage for serialized tasks
pub trait TaskStore {
    /// Returns the serialized data stored under `id`
    ///
    /// A missing id fails with [`StoreError::TaskNotFound`].
    fn load(&self, id: &str) -> Result<String>;

    /// Stores `data` under `id`, recording `message` if the store keeps history
    fn save(&self, id: &str, data: &str, message: &str) -> Result<()>;
}

/// In-memory store, used by tests and when embedding the lifecycle
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<HashMap<String, String>>,
    messages: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages passed to [`TaskStore::save`], oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskStore for MemoryStore {
    fn load(&self, id: &str) -> Result<String> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()).into())
    }

    fn save(&self, id: &str, data: &str, message: &str) -> Result<()> {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), data.to_string());
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
        Ok(())
    }
}
