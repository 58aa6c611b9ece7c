//! External editor round-trip for a single task
//!
//! The task is rendered as a template into a scratch file, the editor runs
//! on it, and the result is parsed back. A malformed file sends the user back
//! into the editor with their text intact.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tracing::debug;

use crate::domain::{parse_template, render_template, ScheduleError, Task, TemplateError};

/// A template that could not be applied to its task
#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Picks the editor command
///
/// `TASKEDITOR` wins, then the configured editor, then `EDITOR`, then the
/// platform default.
pub fn select_editor(configured: Option<&str>) -> String {
    if let Ok(editor) = std::env::var("TASKEDITOR") {
        return editor;
    }
    if let Some(editor) = configured {
        return editor.to_string();
    }
    if let Ok(editor) = std::env::var("EDITOR") {
        return editor;
    }
    if cfg!(windows) {
        "notepad".to_string()
    } else {
        "vi".to_string()
    }
}

/// Applies edited template text to a copy of `task`
pub fn apply_edit(task: &Task, text: &str) -> Result<Task, EditError> {
    let values = parse_template(text)?;
    let mut edited = task.clone();
    edited.apply_fields(values)?;
    Ok(edited)
}

/// Lets the user edit `task` with `editor`, returning the edited copy
pub fn edit_task(task: &Task, editor: &str) -> Result<Task> {
    let mut file = tempfile::Builder::new()
        .prefix("task-")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create scratch file for editing")?;
    file.write_all(render_template(task).as_bytes())
        .context("Failed to write task template")?;
    file.flush().context("Failed to write task template")?;

    let stdin = io::stdin();
    loop {
        launch(editor, file.path())?;
        let text = fs::read_to_string(file.path()).context("Failed to read edited task")?;

        match apply_edit(task, &text) {
            Ok(edited) => {
                debug!(task = %task.id, "edited task");
                return Ok(edited);
            }
            Err(e) => {
                eprint!("Task syntax error (enter returns to editor): {}", e);
                io::stderr().flush().ok();
                let mut line = String::new();
                let read = stdin
                    .lock()
                    .read_line(&mut line)
                    .context("Failed to read from stdin")?;
                if read == 0 {
                    eprintln!();
                    bail!("Edit aborted: {}", e);
                }
            }
        }
    }
}

/// Runs the editor on `path` and waits for it to exit
fn launch(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("Editor command is empty");
    };

    debug!(%editor, path = %path.display(), "launching editor");
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", editor))?;

    if !status.success() {
        bail!("Editor '{}' exited with {}", editor, status);
    }
    Ok(())
}
