//! Git-backed task repository
//!
//! Handles repository initialization and implements [`TaskStore`] on top of
//! one JSON file per task. With history enabled every save is committed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::{Config, ProjectConfig, StoreError, TaskStore, TASKS_DIR};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not in a task repository. Run 'task init' first.")]
    NotInRepo,

    #[error("Git {action} failed: {stderr}")]
    Git { action: String, stderr: String },
}

/// A task repository rooted at a directory containing `.tasks/`
#[derive(Debug)]
pub struct TaskRepo {
    root: PathBuf,
    config: Config,
}

impl TaskRepo {
    /// Opens an existing repository at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(TASKS_DIR).is_dir() {
            return Err(RepoError::NotInRepo.into());
        }

        let config = Config::for_repo(&root)?;
        debug!(root = %root.display(), history = config.project.history, "opened repository");
        Ok(Self { root, config })
    }

    /// Opens the repository containing `start` or one of its parents
    pub fn discover(start: &Path) -> Result<Self> {
        let root = Config::find_repo_root(start).ok_or(RepoError::NotInRepo)?;
        Self::open(root)
    }

    /// Initializes a repository at the given path
    ///
    /// Safe to run on an existing repository: files already present are kept.
    pub fn init(root: impl Into<PathBuf>, history: bool) -> Result<Self> {
        let root = root.into();
        let tasks_dir = root.join(TASKS_DIR);

        let task_files = tasks_dir.join("tasks");
        fs::create_dir_all(&task_files).with_context(|| {
            format!("Failed to create tasks directory: {}", task_files.display())
        })?;

        let config_path = tasks_dir.join("config.toml");
        if !config_path.exists() {
            let config = ProjectConfig {
                history,
                ..ProjectConfig::default()
            };
            let content = format!(
                "# Task tracker configuration\n\n{}",
                toml::to_string_pretty(&config).context("Failed to serialize repository config")?
            );
            fs::write(&config_path, content)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = tasks_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Held while a command runs
.lock

# Left behind by interrupted writes
*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let repo = Self::open(root)?;
        if repo.config.project.history && !repo.root.join(".git").exists() {
            git(&repo.root, &["init", "--quiet"], "init")?;
        }
        Ok(repo)
    }

    /// Returns the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .tasks directory path
    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join(TASKS_DIR)
    }

    /// Path of the JSON file holding task `id`
    pub fn task_path(&self, id: &str) -> PathBuf {
        self.tasks_dir().join("tasks").join(format!("{id}.json"))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stages and commits a single path
    ///
    /// Returns false when git reports there was nothing to commit.
    fn commit(&self, path: &Path, message: &str) -> Result<bool> {
        let path = path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy();
        git(&self.root, &["add", "--", &path], "add")?;

        let unchanged = Command::new("git")
            .args(["diff", "--cached", "--quiet", "--", &path])
            .current_dir(&self.root)
            .status()
            .context("Failed to run git diff")?
            .success();
        if unchanged {
            return Ok(false);
        }

        let output = Command::new("git")
            .args(["commit", "--quiet", "-m", message, "--", &path])
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .context("Failed to run git commit")?;

        if output.status.success() {
            debug!(%message, "committed");
            return Ok(true);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.contains("nothing to commit") || stdout.contains("nothing added to commit") {
            Ok(false)
        } else {
            Err(RepoError::Git {
                action: "commit".to_string(),
                stderr: stderr.trim().to_string(),
            }
            .into())
        }
    }
}

impl TaskStore for TaskRepo {
    fn load(&self, id: &str) -> Result<String> {
        let path = self.task_path(id);
        if !path.exists() {
            return Err(StoreError::TaskNotFound(id.to_string()).into());
        }
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read task: {}", path.display()))
    }

    fn save(&self, id: &str, data: &str, message: &str) -> Result<()> {
        let path = self.task_path(id);
        write_atomic(&path, data)?;
        if self.config.project.history {
            self.commit(&path, message)?;
        }
        Ok(())
    }
}

fn git(root: &Path, args: &[&str], action: &str) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run git {action}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(RepoError::Git {
            action: action.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into())
    }
}

/// Writes `contents` to a temp file next to `path`, then renames it over `path`
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to flush {}", temp_path.display()))?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })
}
