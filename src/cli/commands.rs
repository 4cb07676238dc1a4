//! Command definitions for the StudySmart CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::store::Priority;

// ============================================================================
// CLI Structure
// ============================================================================

/// StudySmart CLI - track study time per subject with a background timer
#[derive(Parser, Debug)]
#[command(
    name = "studysmart",
    version,
    about = "Study tracker with a background session timer",
    long_about = "Tracks study subjects, tasks and recorded sessions.\n\
                  Timer commands talk to a background daemon over a Unix socket;\n\
                  everything else reads and writes the local database directly.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the daemon socket path
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Override the database path
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or resume the study timer
    Start(StartArgs),

    /// Pause the running timer
    Pause,

    /// Cancel the current run, discarding elapsed time
    Cancel,

    /// Finish the run and record a session
    Finish,

    /// Show current timer status
    Status,

    /// Run the background daemon
    Daemon(DaemonArgs),

    /// Manage study subjects
    #[command(subcommand)]
    Subject(SubjectCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Manage recorded sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Show aggregate study statistics
    Dashboard,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Timer Command Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Subject to associate the run with
    #[arg(short, long, value_name = "ID")]
    pub subject: Option<i64>,
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    /// Minimum recordable run length in seconds
    #[arg(
        long,
        default_value = "36",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub min_session_secs: u64,
}

// ============================================================================
// Subject Subcommands
// ============================================================================

/// Subject management commands
#[derive(Subcommand, Debug, Clone)]
pub enum SubjectCommands {
    /// Add a new subject
    Add {
        /// Subject name (1-20 characters)
        name: String,

        /// Target study hours (1-1000)
        #[arg(short, long, default_value = "1")]
        goal_hours: f32,
    },

    /// List all subjects
    List,

    /// Delete a subject together with its tasks and sessions
    Delete {
        /// Subject id
        id: i64,
    },
}

// ============================================================================
// Task Subcommands
// ============================================================================

/// Task management commands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommands {
    /// Add a new task
    Add {
        /// Task title
        #[arg(value_parser = validate_title)]
        title: String,

        /// Owning subject id
        #[arg(short, long, value_name = "ID")]
        subject: i64,

        /// Due date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_due_date)]
        due: i64,

        /// Priority level
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List tasks (incomplete by default)
    List {
        /// Restrict to one subject
        #[arg(short, long, value_name = "ID")]
        subject: Option<i64>,

        /// Show completed tasks instead
        #[arg(long)]
        completed: bool,
    },

    /// Mark a task as complete
    Done {
        /// Task id
        id: i64,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: i64,
    },
}

// ============================================================================
// Session Subcommands
// ============================================================================

/// Session management commands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommands {
    /// List recorded sessions, newest first
    List {
        /// Restrict to one subject
        #[arg(short, long, value_name = "ID")]
        subject: Option<i64>,

        /// Maximum number of sessions to show
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Delete a recorded session
    Delete {
        /// Session id
        id: i64,
    },
}

// ============================================================================
// PriorityArg
// ============================================================================

/// CLI-facing priority value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates the task title.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_title(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("Task title must not be empty".to_string());
    }
    if s.chars().count() > 100 {
        return Err("Task title must be at most 100 characters".to_string());
    }
    Ok(s.to_string())
}

/// Parses a YYYY-MM-DD due date into epoch milliseconds at midnight UTC.
fn parse_due_date(s: &str) -> Result<i64, String> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{s}', expected YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("Invalid date '{s}'"))?;
    Ok(midnight.and_utc().timestamp_millis())
}

// ============================================================================
// Tests
// ============================================================================
