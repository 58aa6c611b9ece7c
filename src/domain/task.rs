//! Task domain model
//!
//! A task has an immutable identity and mutable scheduling attributes. Fields
//! the tool does not know about are kept in `extra` so they survive a
//! load/edit/save cycle untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ScheduleError;
use super::id::{PrefixMatch, TaskId};
use super::priority::Priority;

/// Fields managed by the tool itself; everything else is `extra`
const KNOWN_FIELDS: &[&str] = &["closed_at", "created_at", "description", "id", "priority", "type"];

/// A single work item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, never reassigned
    pub id: TaskId,

    /// Free-form summary
    #[serde(default)]
    pub description: String,

    /// Free-form category (e.g. `build`, `test`, `quick`)
    #[serde(rename = "type", default)]
    pub task_type: String,

    /// Scheduling priority, lower is more urgent
    #[serde(default)]
    pub priority: Priority,

    /// When the task was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// When the task was closed (archived tasks only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Unknown fields, preserved across serialization
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    /// Creates a new task with a fresh id and medium priority
    pub fn new(description: impl Into<String>, task_type: impl Into<String>) -> Self {
        let description = description.into();
        let now = Utc::now();
        Self {
            id: TaskId::new(&description, now),
            description,
            task_type: task_type.into(),
            priority: Priority::default(),
            created_at: now,
            closed_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// Builder-style priority override
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true once the task has been archived
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Marks the task as closed
    pub(crate) fn close(&mut self, at: DateTime<Utc>) {
        if self.closed_at.is_none() {
            self.closed_at = Some(at);
        }
    }

    /// Returns the editable fields as text, keyed by field name
    pub fn editable_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("description".to_string(), self.description.clone());
        fields.insert("type".to_string(), self.task_type.clone());
        fields.insert("priority".to_string(), self.priority.to_string());
        for (key, value) in &self.extra {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.insert(key.clone(), text);
        }
        fields
    }

    /// Applies user-edited field values
    ///
    /// All values are validated before anything changes, so an invalid
    /// priority leaves the task exactly as it was. A missing `priority` falls
    /// back to the default; missing `description`/`type` keep their values.
    /// Unknown keys replace `extra` wholesale.
    pub fn apply_fields(&mut self, mut values: BTreeMap<String, String>) -> Result<(), ScheduleError> {
        let priority = match values.remove("priority") {
            Some(text) => text.parse::<Priority>()?,
            None => Priority::default(),
        };
        let description = values.remove("description");
        let task_type = values.remove("type");

        let mut extra = BTreeMap::new();
        for (key, text) in values {
            if KNOWN_FIELDS.contains(&key.as_str()) {
                continue;
            }
            // Try to parse value as JSON, fall back to string
            let value = serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::Value::String(text.clone()));
            extra.insert(key, value);
        }

        self.priority = priority;
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(task_type) = task_type {
            self.task_type = task_type;
        }
        self.extra = extra;
        Ok(())
    }

    /// Serializes to pretty-printed JSON with sorted keys
    pub fn to_json(&self) -> serde_json::Result<String> {
        // serde_json::Map is ordered by key
        let value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }

    /// Deserializes from JSON produced by [`Task::to_json`]
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

impl PrefixMatch for Task {
    fn matches_prefix(&self, prefix: &str) -> bool {
        self.id.matches_prefix(prefix)
    }
}
