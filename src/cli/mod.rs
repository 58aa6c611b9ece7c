//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Lifecycle operation |
//! |---------|---------------------|
//! | `add` | add a task on top of the active stack |
//! | `show`, `list` | current task, lookups and listings |
//! | `activate` | pull a task to the top of the stack |
//! | `pop` | move the current task to the backlog |
//! | `sleep` | defer the current task |
//! | `done` | close the current task |
//! | `edit`, `priority` | change task data |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr. Use `-v` for info and `-vv` for debug, or set
//! `RUST_LOG`:
//! ```bash
//! task -vv show
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod editor;
mod output;
mod task;

pub use app::{run, Cli, Commands};
pub use editor::{apply_edit, edit_task, select_editor, EditError};
pub use output::{Output, OutputFormat};
