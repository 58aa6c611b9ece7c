//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::task;
use crate::storage::{Config, TaskRepo};

#[derive(Parser)]
#[command(name = "task")]
#[command(author, version, about = "Stack-based personal task tracker")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Task repository root (defaults to searching upward for .tasks/)
    #[arg(long, global = true, env = "TASKMASTER_REPO")]
    pub repo: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new task repository
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Do not commit task changes to git
        #[arg(long)]
        no_history: bool,
    },

    /// Add a task on top of the active stack
    Add {
        /// What needs doing
        description: String,

        /// Task type (defaults to the repository config)
        #[arg(long = "type", short = 't')]
        task_type: Option<String>,

        /// Priority: 0-4 or showstopper, critical, high, medium, low
        #[arg(long, short = 'p')]
        priority: Option<String>,

        /// Invoke an editor for the task
        #[arg(long, short = 'e')]
        edit: bool,
    },

    /// Show the current task, or the task matching an id prefix
    Show {
        /// Task id prefix
        id: Option<String>,
    },

    /// Edit the current task, or the task matching an id prefix
    Edit {
        /// Task id prefix
        id: Option<String>,
    },

    /// Bring a task to the top of the active stack
    Activate {
        /// Task id prefix
        id: String,

        /// Invoke an editor for the task
        #[arg(long, short = 'e')]
        edit: bool,
    },

    /// Move the current task to the backlog
    Pop {
        /// Invoke an editor for the task
        #[arg(long, short = 'e')]
        edit: bool,
    },

    /// Defer the current task for some time
    Sleep {
        /// Duration in minutes
        #[arg(required_unless_present = "until")]
        minutes: Option<u32>,

        /// Wake at this RFC 3339 timestamp instead
        #[arg(long, conflicts_with = "minutes")]
        until: Option<String>,

        /// Invoke an editor for the task
        #[arg(long, short = 'e')]
        edit: bool,
    },

    /// Close out the current task
    Done {
        /// Invoke an editor for the task
        #[arg(long, short = 'e')]
        edit: bool,
    },

    /// Change the priority of the current task, or the task matching an id prefix
    Priority {
        /// New priority: 0-4 or showstopper, critical, high, medium, low
        value: String,

        /// Task id prefix
        id: Option<String>,
    },

    /// List tracked tasks
    List {
        /// Include sleeping, blocked and closed tasks
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Debug tools
    #[command(hide = true)]
    Debug {
        /// Demonstrate logging
        #[arg(long, short = 'l')]
        demo_logging: bool,
    },
}

/// Installs the stderr log subscriber
///
/// `RUST_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open_repo(repo: Option<&Path>) -> Result<TaskRepo> {
    match repo {
        Some(root) => TaskRepo::open(root),
        None => TaskRepo::discover(&std::env::current_dir()?),
    }
}

fn demonstrate_logging() {
    println!("{}", "=".repeat(72));
    println!("Demonstrating Logging Levels");
    println!("{}", "=".repeat(72));
    error!("This is an error message");
    warn!("This is a warning message");
    info!("This is an info message");
    debug!("This is a debug message");
    trace!("This is a trace message");
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format);
    debug!(command = ?std::env::args().nth(1), "task starting");
    let repo = || open_repo(cli.repo.as_deref());

    match cli.command {
        Commands::Init { path, no_history } => {
            let repo = TaskRepo::init(&path, !no_history)?;
            output.success(&format!(
                "Initialized task repository at {}",
                repo.root().display()
            ));
        }

        Commands::Debug { demo_logging } => {
            if demo_logging {
                demonstrate_logging();
            }
        }

        Commands::Add {
            description,
            task_type,
            priority,
            edit,
        } => task::add(&repo()?, &output, &description, task_type, priority, edit)?,
        Commands::Show { id } => task::show(&repo()?, &output, id.as_deref())?,
        Commands::Edit { id } => task::edit(&repo()?, &output, id.as_deref())?,
        Commands::Activate { id, edit } => task::activate(&repo()?, &output, &id, edit)?,
        Commands::Pop { edit } => task::pop(&repo()?, &output, edit)?,
        Commands::Sleep {
            minutes,
            until,
            edit,
        } => task::sleep(&repo()?, &output, minutes, until.as_deref(), edit)?,
        Commands::Done { edit } => task::done(&repo()?, &output, edit)?,
        Commands::Priority { value, id } => {
            task::priority(&repo()?, &output, &value, id.as_deref())?
        }
        Commands::List { all } => task::list(&repo()?, &output, all)?,
    }

    debug!("Command completed successfully");
    Ok(())
}
