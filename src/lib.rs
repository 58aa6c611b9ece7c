//! Taskmaster - a stack-based personal task tracker
//!
//! Tasks move between five holding areas: the active stack, a priority
//! backlog, a dorm for sleeping tasks, limbo for blocked ones and the
//! graveyard. Task data is kept in a git-friendly repository of JSON files.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Holding, Priority, ScheduleError, Task, TaskId, TaskMaster};
