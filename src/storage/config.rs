//! Configuration handling
//!
//! Configuration is stored in `.tasks/config.toml` (repository) and
//! `~/.config/taskmaster/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Priority;

use super::TASKS_DIR;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Repository-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Type given to tasks created without `--type`
    pub default_type: String,

    /// Priority given to tasks created without `--priority`
    pub default_priority: Priority,

    /// Commit every task write to the repository's git history
    pub history: bool,

    /// Editor command, overriding the global one
    pub editor: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            default_type: "quick".to_string(),
            default_priority: Priority::default(),
            history: true,
            editor: None,
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Editor command for editing tasks
    pub editor: Option<String>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + repository)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for the repository at `root`
    pub fn for_repo(root: &Path) -> Result<Self> {
        Ok(Self {
            project: Self::load_project_config(root)?,
            global: Self::load_global()?,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskmaster", "taskmaster")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads repository configuration from a specific root
    pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(TASKS_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read repository config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse repository config")
    }

    /// Finds the repository root by walking up from `start` looking for `.tasks/`
    pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(TASKS_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Editor command: repository setting first, then the global one
    pub fn editor(&self) -> Option<&str> {
        self.project
            .editor
            .as_deref()
            .or(self.global.editor.as_deref())
    }
}
