//! Task commands
//!
//! Every command runs inside one [`Session`]: the lifecycle is restored,
//! changed, and written back only if the command succeeds.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::editor::{edit_task, select_editor};
use super::output::Output;
use crate::domain::{Holding, Priority, ScheduleError, SystemClock, Task, TaskMaster};
use crate::storage::{Session, TaskRepo};

fn session(repo: &TaskRepo) -> Result<Session<'_>> {
    Session::open(repo, Arc::new(SystemClock))
}

/// A session that can also see closed tasks
fn full_session(repo: &TaskRepo) -> Result<Session<'_>> {
    Session::open_with_graveyard(repo, Arc::new(SystemClock))
}

/// Commands looking tasks up by id need the graveyard to report closed ones
fn session_for<'a>(repo: &'a TaskRepo, id: Option<&str>) -> Result<Session<'a>> {
    match id {
        Some(_) => full_session(repo),
        None => session(repo),
    }
}

fn editor(repo: &TaskRepo) -> String {
    select_editor(repo.config().editor())
}

fn task_json(task: &Task, holding: Holding) -> serde_json::Value {
    serde_json::json!({
        "id": task.id.to_string(),
        "description": task.description,
        "type": task.task_type,
        "priority": task.priority.level(),
        "created_at": task.created_at,
        "closed_at": task.closed_at,
        "holding": holding,
        "extra": task.extra,
    })
}

fn summary(output: &Output, task: &Task) -> String {
    format!("{} {}", output.short_id(&task.id), task.description)
}

/// Reports a task that was just moved or changed
fn report(output: &Output, action: &str, task: &Task, holding: Holding, message: String) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "action": action,
            "task": task_json(task, holding),
        }));
    } else {
        output.success(&message);
    }
}

/// The current task, run through the editor first if asked
fn current_for_command(master: &mut TaskMaster, edit: Option<&str>) -> Result<Task> {
    let task = master.current_task()?.clone();
    match edit {
        Some(editor) => {
            let edited = edit_task(&task, editor)?;
            master.update(edited.clone())?;
            Ok(edited)
        }
        None => Ok(task),
    }
}

pub fn add(
    repo: &TaskRepo,
    output: &Output,
    description: &str,
    task_type: Option<String>,
    priority: Option<String>,
    edit: bool,
) -> Result<()> {
    let defaults = &repo.config().project;
    let priority = match priority {
        Some(text) => text.parse::<Priority>()?,
        None => defaults.default_priority,
    };
    let task_type = task_type.unwrap_or_else(|| defaults.default_type.clone());

    let mut task = Task::new(description, task_type).with_priority(priority);
    if edit {
        task = edit_task(&task, &editor(repo))?;
    }

    let mut session = session(repo)?;
    session.master_mut().add(task.clone())?;
    session.finish()?;

    report(
        output,
        "added",
        &task,
        Holding::Active,
        format!("Added {}", summary(output, &task)),
    );
    Ok(())
}

pub fn show(repo: &TaskRepo, output: &Output, id: Option<&str>) -> Result<()> {
    let mut session = session_for(repo, id)?;
    let master = session.master_mut();

    let found = match id {
        Some(prefix) => {
            let (task, holding) = master.find(prefix)?;
            Some((task.clone(), holding))
        }
        None => match master.current_task() {
            Ok(task) => Some((task.clone(), Holding::Active)),
            Err(ScheduleError::Empty) => None,
            Err(e) => return Err(e.into()),
        },
    };
    // looking at the current task may have pulled one in from the backlog
    session.finish()?;

    match found {
        Some((task, holding)) => {
            if output.is_json() {
                output.data(&task_json(&task, holding));
            } else {
                println!("{}", summary(output, &task));
            }
        }
        None => {
            if output.is_json() {
                output.data(&serde_json::Value::Null);
            } else {
                println!("No tasks found!");
            }
        }
    }
    Ok(())
}

pub fn edit(repo: &TaskRepo, output: &Output, id: Option<&str>) -> Result<()> {
    let editor = editor(repo);
    let mut session = session_for(repo, id)?;
    let master = session.master_mut();

    let (task, holding) = match id {
        Some(prefix) => {
            let (task, holding) = master.find(prefix)?;
            (task.clone(), holding)
        }
        None => (master.current_task()?.clone(), Holding::Active),
    };
    if holding == Holding::Closed {
        return Err(ScheduleError::Unavailable {
            id: task.id,
            holding,
        }
        .into());
    }

    let edited = edit_task(&task, &editor)?;
    master.update(edited.clone())?;
    session.finish()?;

    report(
        output,
        "edited",
        &edited,
        holding,
        format!("Updated {}", summary(output, &edited)),
    );
    Ok(())
}

pub fn activate(repo: &TaskRepo, output: &Output, id: &str, edit: bool) -> Result<()> {
    let editor = edit.then(|| editor(repo));
    let mut session = full_session(repo)?;
    let master = session.master_mut();

    let activated = master.activate(id)?;
    let mut task = master
        .get(&activated)
        .cloned()
        .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
    if let Some(editor) = editor {
        task = edit_task(&task, &editor)?;
        master.update(task.clone())?;
    }
    session.finish()?;

    debug!(task = %task.id, "activated");
    report(
        output,
        "activated",
        &task,
        Holding::Active,
        format!("Activated {}", summary(output, &task)),
    );
    Ok(())
}

pub fn pop(repo: &TaskRepo, output: &Output, edit: bool) -> Result<()> {
    let editor = edit.then(|| editor(repo));
    let mut session = session(repo)?;
    let master = session.master_mut();

    let task = current_for_command(master, editor.as_deref())?;
    master.move_to_backlog()?;
    session.finish()?;

    report(
        output,
        "moved",
        &task,
        Holding::Backlog,
        format!("Moved {} to the backlog", summary(output, &task)),
    );
    Ok(())
}

pub fn sleep(
    repo: &TaskRepo,
    output: &Output,
    minutes: Option<u32>,
    until: Option<&str>,
    edit: bool,
) -> Result<()> {
    let until = until
        .map(|text| {
            DateTime::parse_from_rfc3339(text)
                .map(|ts| ts.with_timezone(&Utc))
                .with_context(|| format!("Invalid timestamp '{}': expected RFC 3339", text))
        })
        .transpose()?;

    let editor = edit.then(|| editor(repo));
    let mut session = session(repo)?;
    let master = session.master_mut();

    let task = current_for_command(master, editor.as_deref())?;
    let wake_at = match (until, minutes) {
        (Some(timestamp), _) => {
            master.wake_at(timestamp)?;
            timestamp
        }
        (None, Some(minutes)) => master.sleep(Duration::minutes(i64::from(minutes)))?.1,
        (None, None) => anyhow::bail!("Give a number of minutes or --until"),
    };
    session.finish()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "action": "sleeping",
            "task": task_json(&task, Holding::Sleeping),
            "wake_at": wake_at,
        }));
    } else {
        output.success(&format!(
            "{} sleeping until {}",
            summary(output, &task),
            wake_at.format("%Y-%m-%d %H:%M")
        ));
    }
    Ok(())
}

pub fn done(repo: &TaskRepo, output: &Output, edit: bool) -> Result<()> {
    let editor = edit.then(|| editor(repo));
    let mut session = session(repo)?;
    let master = session.master_mut();

    current_for_command(master, editor.as_deref())?;
    let closed = master.close()?;
    let task = master
        .get(&closed)
        .cloned()
        .ok_or_else(|| ScheduleError::NotFound(closed.to_string()))?;
    session.finish()?;

    report(
        output,
        "closed",
        &task,
        Holding::Closed,
        format!("Closed {}", summary(output, &task)),
    );
    Ok(())
}

pub fn priority(repo: &TaskRepo, output: &Output, value: &str, id: Option<&str>) -> Result<()> {
    let priority: Priority = value.parse()?;
    let mut session = session_for(repo, id)?;
    let master = session.master_mut();

    let prefix = match id {
        Some(prefix) => prefix.to_string(),
        None => master.current_task()?.id.to_string(),
    };
    let changed = master.set_priority(&prefix, priority)?;
    let (task, holding) = master.find(changed.as_str())?;
    let (task, holding) = (task.clone(), holding);
    session.finish()?;

    let label = priority
        .label()
        .map(|label| format!(" ({})", label))
        .unwrap_or_default();
    report(
        output,
        "prioritized",
        &task,
        holding,
        format!("Set priority of {} to {}{}", summary(output, &task), priority, label),
    );
    Ok(())
}

pub fn list(repo: &TaskRepo, output: &Output, all: bool) -> Result<()> {
    // read-only: the session is dropped without writing anything back
    let session = if all { full_session(repo)? } else { session(repo)? };
    let master = session.master();

    if output.is_json() {
        let tasks = |tasks: Vec<&Task>, holding| {
            tasks
                .into_iter()
                .map(|task| task_json(task, holding))
                .collect::<Vec<_>>()
        };
        let mut data = serde_json::json!({
            "active": tasks(master.active(), Holding::Active),
            "backlog": tasks(master.backlog(), Holding::Backlog),
        });
        if all {
            data["sleeping"] = master
                .sleeping()
                .into_iter()
                .map(|(task, wake_at)| {
                    let mut entry = task_json(task, Holding::Sleeping);
                    entry["wake_at"] = serde_json::json!(wake_at);
                    entry
                })
                .collect();
            data["blocked"] = master
                .blocked()
                .into_iter()
                .map(|(task, blockers)| {
                    let mut entry = task_json(task, Holding::Blocked);
                    entry["blockers"] = serde_json::json!(blockers);
                    entry
                })
                .collect();
            data["closed"] = tasks(master.graveyard(), Holding::Closed).into();
        }
        output.data(&data);
        return Ok(());
    }

    if master.is_empty() {
        println!("No tasks found!");
        return Ok(());
    }

    let print_section = |title: &str, lines: Vec<String>| {
        if lines.is_empty() {
            return;
        }
        println!("{}:", title);
        for line in lines {
            println!("  {}", line);
        }
    };
    let line = |task: &Task| format!("{} [{}] {}", output.short_id(&task.id), task.priority, task.description);

    print_section("Active", master.active().into_iter().map(line).collect());
    print_section("Backlog", master.backlog().into_iter().map(line).collect());
    if all {
        print_section(
            "Sleeping",
            master
                .sleeping()
                .into_iter()
                .map(|(task, wake_at)| format!("{} (until {})", line(task), wake_at.format("%Y-%m-%d %H:%M")))
                .collect(),
        );
        print_section(
            "Blocked",
            master
                .blocked()
                .into_iter()
                .map(|(task, blockers)| format!("{} ({} blocker(s))", line(task), blockers))
                .collect(),
        );
        print_section("Closed", master.graveyard().into_iter().map(line).collect());
    }
    Ok(())
}
