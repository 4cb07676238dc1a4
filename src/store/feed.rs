//! Dashboard feed.
//!
//! Aggregates the store into a single snapshot and republishes it over a
//! `watch` channel whenever the store's write revision moves. The channel
//! caches the last value, so late subscribers immediately observe the
//! current snapshot instead of waiting for the next write.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use super::{sessions, subjects, to_u64, Database, Session};

/// Sessions shown on the dashboard.
const RECENT_SESSION_LIMIT: u32 = 5;

/// Point-in-time aggregate view of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub subject_count: u64,
    pub total_goal_hours: f32,
    pub total_duration_secs: u64,
    pub recent_sessions: Vec<Session>,
}

impl DashboardSnapshot {
    /// Computes a fresh snapshot. All four aggregates read in one store
    /// round trip so they are mutually consistent.
    pub async fn load(db: &Database) -> Result<Self> {
        db.execute(|conn| {
            let subject_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))
                .context("failed to count subjects")?;
            Ok(DashboardSnapshot {
                subject_count: to_u64(subject_count)?,
                total_goal_hours: subjects::query_total_goal_hours(conn)?,
                total_duration_secs: sessions::query_total_duration_secs(conn)?,
                recent_sessions: sessions::query_recent_sessions(conn, RECENT_SESSION_LIMIT)?,
            })
        })
        .await
    }
}

/// Keeps a [`DashboardSnapshot`] continuously up to date.
///
/// Owns a background task that recomputes on every store revision; dropping
/// the feed stops the task.
pub struct DashboardFeed {
    snapshot_rx: watch::Receiver<DashboardSnapshot>,
    refresher: JoinHandle<()>,
}

impl DashboardFeed {
    /// Computes the initial snapshot and starts the refresh task.
    pub async fn spawn(db: Database) -> Result<Self> {
        // Subscribe before the initial load so a write landing in between
        // still triggers a recompute.
        let mut changes = db.subscribe();
        let initial = DashboardSnapshot::load(&db).await?;
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let refresher = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                match DashboardSnapshot::load(&db).await {
                    Ok(snapshot) => {
                        if snapshot_tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("dashboard refresh failed: {err:#}"),
                }
            }
        });

        Ok(Self {
            snapshot_rx,
            refresher,
        })
    }

    /// Returns a receiver that replays the current snapshot and wakes on
    /// every refresh.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Returns the most recent snapshot.
    pub fn latest(&self) -> DashboardSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

impl Drop for DashboardFeed {
    fn drop(&mut self) {
        self.refresher.abort();
    }
}
