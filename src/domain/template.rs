//! Plain-text template used to edit a task in an external editor
//!
//! ```text
//! # created_at:
//! # 2024-01-01T00:00:00+00:00
//!
//! # id:
//! # 0123456789abcdef0123456789abcdef
//!
//! description:
//! Write the quarterly report
//!
//! priority:
//! 3
//! ```
//!
//! Read-only fields are rendered as comments. A field header is a single word
//! ending in `:` that follows a blank line (or the start of the file).

use std::collections::BTreeMap;
use thiserror::Error;

use super::task::Task;

/// Fields shown for reference but never accepted back
pub const READ_ONLY_FIELDS: &[&str] = &["created_at", "id"];

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing field name for data:\n{0}")]
    MissingFieldName(String),

    #[error("'{0}' field is read-only")]
    ReadOnlyField(String),
}

/// Renders the editing template for a task
pub fn render_template(task: &Task) -> String {
    let mut lines = Vec::new();

    for key in READ_ONLY_FIELDS {
        let value = match *key {
            "created_at" => task.created_at.to_rfc3339(),
            "id" => task.id.to_string(),
            _ => continue,
        };
        lines.push(format!("# {}:", key));
        for line in value.lines() {
            lines.push(format!("# {}", line));
        }
        lines.push(String::new());
    }

    for (key, value) in task.editable_fields() {
        lines.push(format!("{}:", key));
        lines.push(value);
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Parses a user-authored template into field values
pub fn parse_template(text: &str) -> Result<BTreeMap<String, String>, TemplateError> {
    let mut values = BTreeMap::new();
    // beginning of file always counts as a blank line
    let mut blank_line = true;
    let mut field_name: Option<String> = None;
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.starts_with('#') {
            continue;
        }

        if line.is_empty() {
            blank_line = true;
            current.push(line);
            continue;
        }

        if blank_line && line.ends_with(':') && line.split_whitespace().count() == 1 {
            flush_field(&mut values, field_name.take(), &mut current)?;

            let name = line[..line.len() - 1].to_string();
            if READ_ONLY_FIELDS.contains(&name.as_str()) {
                return Err(TemplateError::ReadOnlyField(name));
            }
            field_name = Some(name);
            blank_line = false;
            continue;
        }

        blank_line = false;
        current.push(line);
    }

    flush_field(&mut values, field_name, &mut current)?;
    Ok(values)
}

/// Stores the collected lines under `field_name`, trimming trailing blanks
fn flush_field(
    values: &mut BTreeMap<String, String>,
    field_name: Option<String>,
    current: &mut Vec<&str>,
) -> Result<(), TemplateError> {
    while current.last().is_some_and(|line| line.is_empty()) {
        current.pop();
    }

    match field_name {
        Some(name) => {
            values.insert(name, current.join("\n"));
        }
        None if !current.is_empty() => {
            return Err(TemplateError::MissingFieldName(current.join("\n")));
        }
        None => {}
    }

    current.clear();
    Ok(())
}
