//! Command sessions
//!
//! A [`Session`] wraps one command's use of the lifecycle. Starting a session
//! takes an exclusive lock and rebuilds the holding structures from disk;
//! [`Session::finish`] writes everything back and releases the lock.
//!
//! ```text
//! .tasks/
//! ├── .lock             # held for the length of a session
//! ├── stack.json        # active ids, bottom-first
//! ├── queue.json        # backlog ids, in serving order
//! └── graveyard.json    # closed ids, in closing order
//! ```
//!
//! Sleeping and blocked tasks are not written to any structure file. Their
//! task data survives, but they drop out of the lifecycle when the session
//! ends.
//!
//! Closed tasks are only loaded by [`Session::open_with_graveyard`]. Other
//! sessions carry the graveyard ids through untouched and append whatever
//! they close.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::domain::{Clock, Task, TaskId, TaskMaster};

use super::repo::write_atomic;
use super::{StoreError, TaskRepo, TaskStore};

const STACK_FILE: &str = "stack.json";
const QUEUE_FILE: &str = "queue.json";
const GRAVEYARD_FILE: &str = "graveyard.json";

pub struct Session<'a> {
    store: &'a dyn TaskStore,
    state_dir: PathBuf,
    lock: File,
    master: TaskMaster,
    /// Graveyard ids read from disk but not loaded into `master`
    archived: Vec<TaskId>,
}

impl<'a> Session<'a> {
    /// Starts a session on a task repository, leaving closed tasks on disk
    pub fn open(repo: &'a TaskRepo, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::begin(repo, repo.tasks_dir(), clock, false)
    }

    /// Starts a session on a task repository with closed tasks loaded
    pub fn open_with_graveyard(repo: &'a TaskRepo, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::begin(repo, repo.tasks_dir(), clock, true)
    }

    /// Starts a session over any store, keeping structure files in `state_dir`
    pub fn start(
        store: &'a dyn TaskStore,
        state_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::begin(store, state_dir.into(), clock, false)
    }

    /// Like [`Session::start`], with closed tasks loaded
    pub fn start_with_graveyard(
        store: &'a dyn TaskStore,
        state_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::begin(store, state_dir.into(), clock, true)
    }

    fn begin(
        store: &'a dyn TaskStore,
        state_dir: PathBuf,
        clock: Arc<dyn Clock>,
        graveyard: bool,
    ) -> Result<Self> {
        fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create directory: {}", state_dir.display()))?;

        let lock_path = state_dir.join(".lock");
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
        if lock.try_lock_exclusive().is_err() {
            info!("Waiting for another task command to finish...");
            lock.lock_exclusive()
                .context("Failed to acquire lock on task repository")?;
        }

        let active = load_tasks(store, &state_dir.join(STACK_FILE))?;
        let backlog = load_tasks(store, &state_dir.join(QUEUE_FILE))?;
        let (closed, archived) = if graveyard {
            (load_tasks(store, &state_dir.join(GRAVEYARD_FILE))?, Vec::new())
        } else {
            (Vec::new(), read_ids(&state_dir.join(GRAVEYARD_FILE))?)
        };
        let master = TaskMaster::restore(clock, active, backlog, closed)
            .context("Task structures are inconsistent")?;

        Ok(Self {
            store,
            state_dir,
            lock,
            master,
            archived,
        })
    }

    pub fn master(&self) -> &TaskMaster {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut TaskMaster {
        &mut self.master
    }

    /// Writes modified tasks and the structure files, then releases the lock
    ///
    /// Dropping a session without calling this discards its changes.
    pub fn finish(mut self) -> Result<()> {
        for (task, wake_at) in self.master.sleeping() {
            warn!(
                "Task {} is sleeping until {} and will be dropped: sleeping tasks are not saved",
                task.id.short(),
                wake_at
            );
        }
        for (task, _) in self.master.blocked() {
            warn!(
                "Task {} is blocked and will be dropped: blocked tasks are not saved",
                task.id.short()
            );
        }

        let dirty = self.master.take_dirty();
        for task in &dirty {
            let data = task.to_json().context("Failed to serialize task")?;
            self.store
                .save(task.id.as_str(), &data, &format!("Update task {}", task.id))
                .with_context(|| format!("Failed to save task {}", task.id))?;
        }

        write_ids(&self.state_dir.join(STACK_FILE), &self.master.active_ids())?;
        write_ids(&self.state_dir.join(QUEUE_FILE), &self.master.backlog_ids())?;
        let mut closed = std::mem::take(&mut self.archived);
        closed.extend(self.master.graveyard_ids());
        write_ids(&self.state_dir.join(GRAVEYARD_FILE), &closed)?;
        debug!(saved = dirty.len(), "session finished");

        FileExt::unlock(&self.lock).context("Failed to release lock on task repository")
    }
}

/// Reads the ids in a structure file; a missing file is an empty structure
fn read_ids(path: &Path) -> Result<Vec<TaskId>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Reads a structure file and resolves its ids through the store
///
/// Every listed id must have task data; a missing task is an error.
fn load_tasks(store: &dyn TaskStore, path: &Path) -> Result<Vec<Task>> {
    let ids = read_ids(path)?;

    let mut tasks = Vec::with_capacity(ids.len());
    for id in ids {
        let data = store.load(id.as_str()).map_err(|e| {
            if e.downcast_ref::<StoreError>().is_some() {
                e.context(format!("Task {} listed in {} has no task file", id, path.display()))
            } else {
                e.context(format!("Failed to load task {}", id))
            }
        })?;
        let task = Task::from_json(&data).with_context(|| format!("Failed to parse task {}", id))?;
        if task.id != id {
            anyhow::bail!("Task file for {} contains task {}", id, task.id);
        }
        tasks.push(task);
    }
    Ok(tasks)
}

fn write_ids(path: &Path, ids: &[TaskId]) -> Result<()> {
    let content = serde_json::to_string_pretty(ids).context("Failed to serialize task ids")?;
    write_atomic(path, &content)
}
