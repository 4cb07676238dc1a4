//! StudySmart CLI - personal study tracking with a background timer
//!
//! Timer commands are forwarded to the daemon over a Unix socket; subject,
//! task and session management reads and writes the shared SQLite database
//! directly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use studysmart::cli::{
    Cli, Commands, DaemonArgs, Display, IpcClient, SessionCommands, StartArgs, SubjectCommands,
    TaskCommands,
};
use studysmart::daemon::{self, DaemonConfig};
use studysmart::paths;
use studysmart::store::{DashboardSnapshot, Database, Subject, Task};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse();

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&e.to_string());
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let socket_path = resolve_socket_path(&cli)?;

    match cli.command.clone() {
        Some(Commands::Start(StartArgs { subject })) => {
            let client = IpcClient::new(socket_path);
            let response = client.start(subject).await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Pause) => {
            let client = IpcClient::new(socket_path);
            let response = client.pause().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Cancel) => {
            let client = IpcClient::new(socket_path);
            let response = client.cancel().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Finish) => {
            let client = IpcClient::new(socket_path);
            let response = client.finish().await?;
            Display::show_timer_result(&response);
        }
        Some(Commands::Status) => {
            let client = IpcClient::new(socket_path);
            let response = client.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Daemon(DaemonArgs { min_session_secs })) => {
            daemon::run(DaemonConfig {
                socket_path,
                db_path: resolve_db_path(&cli)?,
                min_session_secs,
            })
            .await?;
        }
        Some(Commands::Subject(command)) => {
            let store = open_store(&cli)?;
            execute_subject(&store, command).await?;
        }
        Some(Commands::Task(command)) => {
            let store = open_store(&cli)?;
            execute_task(&store, command).await?;
        }
        Some(Commands::Session(command)) => {
            let store = open_store(&cli)?;
            execute_session(&store, command).await?;
        }
        Some(Commands::Dashboard) => {
            let store = open_store(&cli)?;
            let snapshot = DashboardSnapshot::load(&store).await?;
            Display::show_dashboard(&snapshot);
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Executes a subject management command.
async fn execute_subject(store: &Database, command: SubjectCommands) -> Result<()> {
    match command {
        SubjectCommands::Add { name, goal_hours } => {
            let id = store.upsert_subject(&Subject::new(name, goal_hours)).await?;
            println!("Subject added with id {id}");
        }
        SubjectCommands::List => {
            let subjects = store.get_all_subjects().await?;
            Display::show_subjects(&subjects);
        }
        SubjectCommands::Delete { id } => {
            store.delete_subject(id).await?;
            println!("Subject deleted, along with its tasks and sessions");
        }
    }
    Ok(())
}

/// Executes a task management command.
async fn execute_task(store: &Database, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::Add {
            title,
            subject,
            due,
            priority,
            description,
        } => {
            let owner = store
                .get_subject_by_id(subject)
                .await?
                .context("Subject not found")?;
            let id = store
                .upsert_task(&Task {
                    id: None,
                    title,
                    description,
                    due_date: due,
                    priority: priority.into(),
                    subject_name: owner.name,
                    subject_id: subject,
                    complete: false,
                })
                .await?;
            println!("Task added with id {id}");
        }
        TaskCommands::List { subject, completed } => {
            let tasks = match subject {
                Some(id) => store.get_tasks_for_subject(id, completed).await?,
                None => store.get_tasks(completed).await?,
            };
            Display::show_tasks(&tasks);
        }
        TaskCommands::Done { id } => {
            let mut task = store.get_task_by_id(id).await?.context("Task not found")?;
            task.complete = true;
            store.upsert_task(&task).await?;
            println!("Task marked as complete");
        }
        TaskCommands::Delete { id } => {
            store.delete_task(id).await?;
            println!("Task deleted");
        }
    }
    Ok(())
}

/// Executes a session management command.
async fn execute_session(store: &Database, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::List { subject, limit } => {
            let sessions = match (subject, limit) {
                (Some(id), limit) => {
                    store
                        .get_recent_sessions_for_subject(id, limit.unwrap_or(u32::MAX))
                        .await?
                }
                (None, Some(limit)) => store.get_recent_sessions(limit).await?,
                (None, None) => store.get_all_sessions().await?,
            };
            Display::show_sessions(&sessions);
        }
        SessionCommands::Delete { id } => {
            store.delete_session(id).await?;
            println!("Session deleted successfully");
        }
    }
    Ok(())
}

/// Resolves the socket path from the CLI override or the default location.
fn resolve_socket_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.socket {
        Some(path) => Ok(path.clone()),
        None => paths::default_socket_path(),
    }
}

/// Resolves the database path from the CLI override or the default location.
fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.db {
        Some(path) => Ok(path.clone()),
        None => paths::default_db_path(),
    }
}

/// Opens the store for direct CLI access.
fn open_store(cli: &Cli) -> Result<Database> {
    Database::open(resolve_db_path(cli)?)
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
