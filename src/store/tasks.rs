//! Task queries.
//!
//! Listings are ordered by due date ascending, then priority descending, so
//! the most urgent work sorts first.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, Priority, Task};

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: i64 = row.get("priority")?;
    Ok(Task {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        priority: Priority::from_i64(priority),
        subject_name: row.get("subject_name")?,
        subject_id: row.get("subject_id")?,
        complete: row.get("complete")?,
    })
}

const TASK_COLUMNS: &str =
    "id, title, description, due_date, priority, subject_name, subject_id, complete";

impl Database {
    /// Inserts a new task or updates an existing one by id.
    ///
    /// Returns the task's rowid.
    pub async fn upsert_task(&self, task: &Task) -> Result<i64> {
        let task = task.clone();
        let id = self
            .execute(move |conn| match task.id {
                Some(id) => {
                    let updated = conn
                        .execute(
                            "UPDATE tasks
                             SET title = ?1, description = ?2, due_date = ?3, priority = ?4,
                                 subject_name = ?5, subject_id = ?6, complete = ?7
                             WHERE id = ?8",
                            params![
                                task.title,
                                task.description,
                                task.due_date,
                                task.priority.as_i64(),
                                task.subject_name,
                                task.subject_id,
                                task.complete,
                                id
                            ],
                        )
                        .context("failed to update task")?;
                    anyhow::ensure!(updated == 1, "task {id} not found");
                    Ok(id)
                }
                None => {
                    conn.execute(
                        "INSERT INTO tasks
                         (title, description, due_date, priority, subject_name, subject_id, complete)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            task.title,
                            task.description,
                            task.due_date,
                            task.priority.as_i64(),
                            task.subject_name,
                            task.subject_id,
                            task.complete,
                        ],
                    )
                    .context("failed to insert task")?;
                    Ok(conn.last_insert_rowid())
                }
            })
            .await?;

        self.mark_changed();
        Ok(id)
    }

    /// Deletes one task by id.
    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let deleted = conn
                .execute("DELETE FROM tasks WHERE id = ?1", params![task_id])
                .context("failed to delete task")?;
            anyhow::ensure!(deleted == 1, "task {task_id} not found");
            Ok(())
        })
        .await?;

        self.mark_changed();
        Ok(())
    }

    /// Deletes every task belonging to `subject_id`.
    pub async fn delete_tasks_for_subject(&self, subject_id: i64) -> Result<u64> {
        let deleted = self
            .execute(move |conn| {
                let deleted = conn
                    .execute("DELETE FROM tasks WHERE subject_id = ?1", params![subject_id])
                    .context("failed to delete subject tasks")?;
                Ok(deleted as u64)
            })
            .await?;

        if deleted > 0 {
            self.mark_changed();
        }
        Ok(deleted)
    }

    /// Looks up a single task; `None` when the id is unknown.
    pub async fn get_task_by_id(&self, task_id: i64) -> Result<Option<Task>> {
        self.execute(move |conn| {
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![task_id],
                task_from_row,
            )
            .optional()
            .context("failed to query task")
        })
        .await
    }

    /// Returns a subject's tasks filtered by completion state.
    pub async fn get_tasks_for_subject(
        &self,
        subject_id: i64,
        complete: bool,
    ) -> Result<Vec<Task>> {
        self.execute(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE subject_id = ?1 AND complete = ?2
                     ORDER BY due_date ASC, priority DESC"
                ))
                .context("failed to prepare task listing")?;
            let tasks = stmt
                .query_map(params![subject_id, complete], task_from_row)
                .context("failed to list subject tasks")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read task rows")?;
            Ok(tasks)
        })
        .await
    }

    /// Returns every task with the given completion state, across subjects.
    pub async fn get_tasks(&self, complete: bool) -> Result<Vec<Task>> {
        self.execute(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE complete = ?1
                     ORDER BY due_date ASC, priority DESC"
                ))
                .context("failed to prepare task listing")?;
            let tasks = stmt
                .query_map(params![complete], task_from_row)
                .context("failed to list tasks")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to read task rows")?;
            Ok(tasks)
        })
        .await
    }
}
