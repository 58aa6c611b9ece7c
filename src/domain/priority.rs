//! Task priority
//!
//! Follows the Unix model: lower value means more urgent, `0` is the most
//! urgent of all. Values are validated at the boundary; a negative number or
//! unparsable text never reaches a task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u32);

impl Priority {
    pub const SHOWSTOPPER: Priority = Priority(0);
    pub const CRITICAL: Priority = Priority(1);
    pub const HIGH: Priority = Priority(2);
    pub const MEDIUM: Priority = Priority(3);
    pub const LOW: Priority = Priority(4);

    /// Creates a priority from a raw level
    pub fn new(level: u32) -> Self {
        Self(level)
    }

    /// Returns the raw level
    pub fn level(&self) -> u32 {
        self.0
    }

    /// Returns the name of a well-known level
    pub fn label(&self) -> Option<&'static str> {
        match self.0 {
            0 => Some("showstopper"),
            1 => Some("critical"),
            2 => Some("high"),
            3 => Some("medium"),
            4 => Some("low"),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::MEDIUM
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let by_name = match trimmed.to_ascii_lowercase().as_str() {
            "showstopper" => Some(Priority::SHOWSTOPPER),
            "critical" => Some(Priority::CRITICAL),
            "high" => Some(Priority::HIGH),
            "medium" => Some(Priority::MEDIUM),
            "low" => Some(Priority::LOW),
            _ => None,
        };
        if let Some(priority) = by_name {
            return Ok(priority);
        }

        trimmed
            .parse::<u32>()
            .map(Priority)
            .map_err(|_| ScheduleError::InvalidPriority(trimmed.to_string()))
    }
}

impl TryFrom<i64> for Priority {
    type Error = ScheduleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Priority)
            .map_err(|_| ScheduleError::InvalidPriority(value.to_string()))
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        i64::from(priority.0)
    }
}
