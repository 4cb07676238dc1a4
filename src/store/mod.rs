//! Persistent store for subjects, sessions and tasks.
//!
//! SQLite (via `rusqlite`) owned by a dedicated worker thread. Async callers
//! submit closures over a channel and await the result on a oneshot reply,
//! so store I/O never blocks the tokio runtime or the timer tick task.
//!
//! Every successful write bumps a `watch`-based revision counter; derived
//! views (see [`feed`]) recompute whenever the revision changes, which gives
//! last-value caching and late-subscriber replay for free.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error};

pub mod feed;
mod models;
mod sessions;
mod subjects;
mod tasks;

pub use feed::{DashboardFeed, DashboardSnapshot};
pub use models::{
    Priority, Session, Subject, Task, ValidationError, GOAL_HOURS_RANGE, SUBJECT_NAME_MAX_CHARS,
};

// ============================================================================
// Worker plumbing
// ============================================================================

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    changes: watch::Sender<u64>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if self.sender.send(DbCommand::Shutdown).is_err() {
                error!("store worker already gone at shutdown");
            }
            if let Err(join_err) = handle.join() {
                error!("failed to join store worker thread: {join_err:?}");
            }
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// Handle to the store. Cheap to clone; all clones share one worker thread
/// and one revision channel.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Opens (or creates) the database at `db_path` and runs schema setup.
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        Self::spawn_worker(db_path, false)
    }

    /// Opens an in-memory database. Used by tests; the single worker thread
    /// owns the single connection, so the usual in-memory caveats don't bite.
    pub fn open_in_memory() -> Result<Self> {
        Self::spawn_worker(PathBuf::from(":memory:"), true)
    }

    fn spawn_worker(db_path: PathBuf, in_memory: bool) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (changes_tx, _) = watch::channel(0u64);
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("studysmart-db".into())
            .spawn(move || {
                let open_result = if in_memory {
                    Connection::open_in_memory()
                } else {
                    Connection::open(&path_for_thread)
                };
                let mut conn = match open_result {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(
                            anyhow::Error::new(err).context("failed to open SQLite database")
                        ));
                        return;
                    }
                };

                if !in_memory {
                    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                        error!("failed to enable WAL mode: {err}");
                    }
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("failed to enable foreign keys: {err}");
                }

                let init_result = init_schema(&mut conn).context("failed to initialize schema");
                if ready_tx.send(init_result).is_err() {
                    error!("store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                debug!("store worker thread shutting down");
            })
            .context("failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        debug!("store opened at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
                changes: changes_tx,
            }),
            db_path: Arc::new(db_path),
        })
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Runs `task` on the worker thread and awaits its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store worker: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store worker terminated unexpectedly"))?
    }

    /// Subscribes to the write-revision channel.
    ///
    /// The receiver replays the current revision to late subscribers and
    /// wakes whenever any write completes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Bumps the revision after a successful write.
    pub(crate) fn mark_changed(&self) {
        self.inner.changes.send_modify(|revision| *revision += 1);
    }
}

// ============================================================================
// Schema
// ============================================================================

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS subjects (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            goal_hours  REAL NOT NULL,
            colors      TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS sessions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id    INTEGER NOT NULL,
            subject_name  TEXT NOT NULL,
            date          INTEGER NOT NULL,
            duration_secs INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tasks (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            due_date     INTEGER NOT NULL,
            priority     INTEGER NOT NULL,
            subject_name TEXT NOT NULL,
            subject_id   INTEGER NOT NULL,
            complete     INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_subject ON sessions(subject_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date DESC);
        CREATE INDEX IF NOT EXISTS idx_tasks_subject ON tasks(subject_id);",
    )
    .context("schema creation failed")?;
    Ok(())
}

// ============================================================================
// Column conversion helpers
// ============================================================================

pub(crate) fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub(crate) fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

/// Encodes the display-color list as comma-joined hex.
pub(crate) fn encode_colors(colors: &[u32]) -> String {
    colors
        .iter()
        .map(|c| format!("{:08x}", c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes a comma-joined hex color list; malformed entries are skipped.
pub(crate) fn decode_colors(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter(|part| !part.is_empty())
        .filter_map(|part| u32::from_str_radix(part, 16).ok())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
