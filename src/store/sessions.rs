//! Session queries.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use super::{to_i64, to_u64, Database, Session};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let duration: i64 = row.get("duration_secs")?;
    Ok(Session {
        id: Some(row.get("id")?),
        subject_id: row.get("subject_id")?,
        subject_name: row.get("subject_name")?,
        date: row.get("date")?,
        // negative durations cannot be written by this crate
        duration_secs: duration.max(0) as u64,
    })
}

const SESSION_COLUMNS: &str = "id, subject_id, subject_name, date, duration_secs";

impl Database {
    /// Inserts a new session or updates an existing one by id.
    ///
    /// Returns the session's rowid.
    pub async fn upsert_session(&self, session: &Session) -> Result<i64> {
        let session = session.clone();
        let id = self
            .execute(move |conn| {
                let duration = to_i64(session.duration_secs)?;
                match session.id {
                    Some(id) => {
                        let updated = conn
                            .execute(
                                "UPDATE sessions
                                 SET subject_id = ?1, subject_name = ?2, date = ?3,
                                     duration_secs = ?4
                                 WHERE id = ?5",
                                params![
                                    session.subject_id,
                                    session.subject_name,
                                    session.date,
                                    duration,
                                    id
                                ],
                            )
                            .context("failed to update session")?;
                        anyhow::ensure!(updated == 1, "session {id} not found");
                        Ok(id)
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO sessions (subject_id, subject_name, date, duration_secs)
                             VALUES (?1, ?2, ?3, ?4)",
                            params![
                                session.subject_id,
                                session.subject_name,
                                session.date,
                                duration
                            ],
                        )
                        .context("failed to insert session")?;
                        Ok(conn.last_insert_rowid())
                    }
                }
            })
            .await?;

        self.mark_changed();
        Ok(id)
    }

    /// Deletes one session by id.
    pub async fn delete_session(&self, session_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let deleted = conn
                .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
                .context("failed to delete session")?;
            anyhow::ensure!(deleted == 1, "session {session_id} not found");
            Ok(())
        })
        .await?;

        self.mark_changed();
        Ok(())
    }

    /// Deletes every session belonging to `subject_id`.
    pub async fn delete_sessions_for_subject(&self, subject_id: i64) -> Result<u64> {
        let deleted = self
            .execute(move |conn| {
                let deleted = conn
                    .execute(
                        "DELETE FROM sessions WHERE subject_id = ?1",
                        params![subject_id],
                    )
                    .context("failed to delete subject sessions")?;
                Ok(deleted as u64)
            })
            .await?;

        if deleted > 0 {
            self.mark_changed();
        }
        Ok(deleted)
    }

    /// Returns every session, newest first.
    pub async fn get_all_sessions(&self) -> Result<Vec<Session>> {
        self.execute(|conn| {
            query_sessions(
                conn,
                &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY date DESC"),
                [],
            )
        })
        .await
    }

    /// Returns the `limit` most recent sessions.
    pub async fn get_recent_sessions(&self, limit: u32) -> Result<Vec<Session>> {
        self.execute(move |conn| {
            query_recent_sessions(conn, limit)
        })
        .await
    }

    /// Returns the `limit` most recent sessions for one subject.
    pub async fn get_recent_sessions_for_subject(
        &self,
        subject_id: i64,
        limit: u32,
    ) -> Result<Vec<Session>> {
        self.execute(move |conn| {
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE subject_id = ?1 ORDER BY date DESC LIMIT ?2"
                ),
                params![subject_id, limit],
            )
        })
        .await
    }

    /// Total recorded study time across all sessions, in seconds.
    pub async fn get_total_duration_secs(&self) -> Result<u64> {
        self.execute(|conn| query_total_duration_secs(conn)).await
    }

    /// Total recorded study time for one subject, in seconds.
    pub async fn get_total_duration_secs_for_subject(&self, subject_id: i64) -> Result<u64> {
        self.execute(move |conn| {
            let total: i64 = conn
                .query_row(
                    "SELECT COALESCE(SUM(duration_secs), 0) FROM sessions WHERE subject_id = ?1",
                    params![subject_id],
                    |row| row.get(0),
                )
                .context("failed to sum subject durations")?;
            to_u64(total)
        })
        .await
    }
}

fn query_sessions<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare session query")?;
    let sessions = stmt
        .query_map(params, session_from_row)
        .context("failed to query sessions")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read session rows")?;
    Ok(sessions)
}

pub(crate) fn query_recent_sessions(conn: &Connection, limit: u32) -> Result<Vec<Session>> {
    query_sessions(
        conn,
        &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY date DESC LIMIT ?1"),
        params![limit],
    )
}

pub(crate) fn query_total_duration_secs(conn: &Connection) -> Result<u64> {
    let total: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(duration_secs), 0) FROM sessions",
            [],
            |row| row.get(0),
        )
        .context("failed to sum durations")?;
    to_u64(total)
}
