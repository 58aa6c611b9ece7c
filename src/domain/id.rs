//! Task identifiers
//!
//! A task id is 32 lowercase hex characters (e.g. `9d3e5f2a...`). It is derived
//! from the description, the creation timestamp and a process-local counter, so
//! two tasks created in the same instant with the same text still differ.
//!
//! Users refer to tasks by any unambiguous prefix of the id; the first 7
//! characters are what the CLI prints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Length of a full task id
pub const ID_LEN: usize = 32;

/// Length of the abbreviated id shown to users
pub const SHORT_ID_LEN: usize = 7;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID format: expected 32 hex characters, got '{0}'")]
    InvalidTaskId(String),
}

/// Generates a full-length hex hash from description and timestamp
fn generate_hash(description: &str, timestamp: DateTime<Utc>) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let input = format!(
        "{}{}{}",
        description,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        seq
    );
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..ID_LEN].to_string()
}

/// Opaque, immutable task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new id from a description and creation timestamp
    pub fn new(description: &str, timestamp: DateTime<Utc>) -> Self {
        Self(generate_hash(description, timestamp))
    }

    /// Returns the full id text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated id
    pub fn short(&self) -> &str {
        &self.0[..SHORT_ID_LEN]
    }

    /// Returns true if `prefix` is a prefix of this id
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = s.len() == ID_LEN
            && s.chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Anything that can be looked up by id prefix
pub trait PrefixMatch {
    fn matches_prefix(&self, prefix: &str) -> bool;
}

impl PrefixMatch for TaskId {
    fn matches_prefix(&self, prefix: &str) -> bool {
        TaskId::matches_prefix(self, prefix)
    }
}
