//! Domain models for the task tracker
//!
//! Holding structures, the task model and the lifecycle that moves tasks
//! between them. Nothing in here touches the filesystem.

mod clock;
mod dorm;
mod error;
mod id;
mod lifecycle;
mod limbo;
mod priority;
mod priority_queue;
mod stack;
mod task;
mod template;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dorm::Dorm;
pub use error::ScheduleError;
pub use id::{IdError, PrefixMatch, TaskId, SHORT_ID_LEN};
pub use lifecycle::{Holding, TaskMaster};
pub use limbo::Limbo;
pub use priority::Priority;
pub use priority_queue::PriorityQueue;
pub use stack::ActiveStack;
pub use task::Task;
pub use template::{parse_template, render_template, TemplateError, READ_ONLY_FIELDS};
