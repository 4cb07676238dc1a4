//! Subject queries.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decode_colors, encode_colors, Database, Subject};

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    let colors: String = row.get("colors")?;
    Ok(Subject {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        goal_hours: row.get("goal_hours")?,
        colors: decode_colors(&colors),
    })
}

impl Database {
    /// Inserts a new subject or updates an existing one by id.
    ///
    /// Validates before touching the store. Returns the subject's rowid.
    pub async fn upsert_subject(&self, subject: &Subject) -> Result<i64> {
        subject.validate()?;

        let subject = subject.clone();
        let id = self
            .execute(move |conn| {
                let colors = encode_colors(&subject.colors);
                match subject.id {
                    Some(id) => {
                        let updated = conn
                            .execute(
                                "UPDATE subjects SET name = ?1, goal_hours = ?2, colors = ?3
                                 WHERE id = ?4",
                                params![subject.name, subject.goal_hours, colors, id],
                            )
                            .context("failed to update subject")?;
                        anyhow::ensure!(updated == 1, "subject {id} not found");
                        Ok(id)
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO subjects (name, goal_hours, colors)
                             VALUES (?1, ?2, ?3)",
                            params![subject.name, subject.goal_hours, colors],
                        )
                        .context("failed to insert subject")?;
                        Ok(conn.last_insert_rowid())
                    }
                }
            })
            .await?;

        self.mark_changed();
        Ok(id)
    }

    /// Deletes a subject together with its tasks and sessions.
    ///
    /// The cascade runs in one transaction so a crash can't leave orphans.
    pub async fn delete_subject(&self, subject_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction().context("failed to begin transaction")?;
            tx.execute("DELETE FROM tasks WHERE subject_id = ?1", params![subject_id])
                .context("failed to delete subject tasks")?;
            tx.execute(
                "DELETE FROM sessions WHERE subject_id = ?1",
                params![subject_id],
            )
            .context("failed to delete subject sessions")?;
            let deleted = tx
                .execute("DELETE FROM subjects WHERE id = ?1", params![subject_id])
                .context("failed to delete subject")?;
            anyhow::ensure!(deleted == 1, "subject {subject_id} not found");
            tx.commit().context("failed to commit subject delete")?;
            Ok(())
        })
        .await?;

        self.mark_changed();
        Ok(())
    }

    /// Looks up a single subject; `None` when the id is unknown.
    pub async fn get_subject_by_id(&self, subject_id: i64) -> Result<Option<Subject>> {
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, name, goal_hours, colors FROM subjects WHERE id = ?1",
                params![subject_id],
                subject_from_row,
            )
            .optional()
            .context("failed to query subject")
        })
        .await
    }

    /// Returns every subject, oldest first.
    pub async fn get_all_subjects(&self) -> Result<Vec<Subject>> {
        self.execute(|conn| query_all_subjects(conn)).await
    }

    /// Returns the number of subjects.
    pub async fn get_total_subject_count(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))
                .context("failed to count subjects")?;
            super::to_u64(count)
        })
        .await
    }

    /// Sums goal hours across all subjects.
    pub async fn get_total_goal_hours(&self) -> Result<f32> {
        self.execute(|conn| query_total_goal_hours(conn)).await
    }
}

pub(crate) fn query_all_subjects(conn: &Connection) -> Result<Vec<Subject>> {
    let mut stmt = conn
        .prepare("SELECT id, name, goal_hours, colors FROM subjects ORDER BY id ASC")
        .context("failed to prepare subject listing")?;
    let subjects = stmt
        .query_map([], subject_from_row)
        .context("failed to list subjects")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read subject rows")?;
    Ok(subjects)
}

pub(crate) fn query_total_goal_hours(conn: &Connection) -> Result<f32> {
    let total: f64 = conn
        .query_row(
            "SELECT COALESCE(SUM(goal_hours), 0) FROM subjects",
            [],
            |row| row.get(0),
        )
        .context("failed to sum goal hours")?;
    Ok(total as f32)
}
