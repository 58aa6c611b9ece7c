//! Scheduling errors shared by every holding structure

use thiserror::Error;

use super::id::TaskId;
use super::lifecycle::Holding;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    /// A removal or peek found nothing to return
    #[error("Nothing to do: no tasks available")]
    Empty,

    #[error("No such task: '{0}'")]
    NotFound(String),

    #[error("'{item}' is already blocked by '{blocker}'")]
    DuplicateBlock { item: String, blocker: String },

    #[error("Invalid priority '{0}': expected a non-negative integer or one of showstopper, critical, high, medium, low")]
    InvalidPriority(String),

    #[error("Task '{id}' is already tracked ({holding})")]
    AlreadyTracked { id: TaskId, holding: Holding },

    #[error("Task '{0}' cannot block itself")]
    SelfBlock(TaskId),

    #[error("'{blocker}' is already waiting on '{item}'")]
    BlockCycle { item: TaskId, blocker: TaskId },

    #[error("Task '{id}' is {holding} and cannot be changed")]
    Unavailable { id: TaskId, holding: Holding },
}
