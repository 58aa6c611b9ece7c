//! # Storage Layer
//!
//! Persistence for the task lifecycle, laid out to be committed to git.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSON, one file per task | `.tasks/tasks/{id}.json` |
//! | Structures | JSON arrays of ids | `.tasks/{stack,queue,graveyard}.json` |
//! | Config | TOML | `.tasks/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - A [`Session`] holds an exclusive `fs2` lock on `.tasks/.lock`
//! - All writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`TaskRepo`] - Entry point for a repository; git-backed [`TaskStore`]
//! - [`MemoryStore`] - In-memory [`TaskStore`]
//! - [`Session`] - Restores the lifecycle and writes it back
//! - [`Config`] - Repository and global configuration

mod config;
mod repo;
mod session;
mod store;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use repo::{RepoError, TaskRepo};
pub use session::Session;
pub use store::{MemoryStore, StoreError, TaskStore};

/// Directory marking the root of a task repository
pub const TASKS_DIR: &str = ".tasks";
