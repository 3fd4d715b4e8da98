//! Storage layer for blockcal: a single SQLite database.

use crate::types::{NewTask, Task};
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::fs;
use std::path::Path;

/// Storage directory name.
pub const STORE_DIR: &str = ".blockcal";

/// SQLite database file.
pub const DB_FILE: &str = "blockcal.db";

const TASK_COLUMNS: &str = "id, date, start_time, duration, title, location, description, created_at, updated_at";

/// Storage handle for reading/writing tasks.
pub struct Storage {
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let store_dir = root.join(STORE_DIR);
        fs::create_dir_all(&store_dir).context("Failed to create .blockcal directory")?;

        let db = Connection::open(store_dir.join(DB_FILE)).context("Failed to open SQLite database")?;

        let storage = Self { db };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self> {
        let store_dir = root.join(STORE_DIR);
        if !store_dir.exists() {
            eyre::bail!("No .blockcal directory found. Run 'bc init' first.");
        }

        let db = Connection::open(store_dir.join(DB_FILE)).context("Failed to open SQLite database")?;

        let storage = Self { db };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<()> {
        // AUTOINCREMENT keeps ids of deleted rows from being handed out again
        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    duration INTEGER NOT NULL CHECK (duration > 0),
                    title TEXT NOT NULL,
                    location TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tasks_when ON tasks(date, start_time);
            "#,
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// Insert a new task and return it with its assigned id.
    pub fn insert_task(&mut self, new: &NewTask, now: DateTime<Utc>) -> Result<Task> {
        insert_row(&self.db, new, now)
    }

    /// Replace a task's fields by id. Returns false if no row matched.
    pub fn update_task(&mut self, task: &Task) -> Result<bool> {
        update_row(&self.db, task)
    }

    /// Delete a task by id. Returns false if no row matched.
    pub fn delete_task(&mut self, id: i64) -> Result<bool> {
        let n = self
            .db
            .execute("DELETE FROM tasks WHERE id = ?", params![id])
            .context("Failed to delete task")?;
        Ok(n > 0)
    }

    /// Get a task by id.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let task = self
            .db
            .query_row(&sql, params![id], Self::row_to_task)
            .optional()?;
        Ok(task)
    }

    /// Get every task whose id is in `ids`. Missing ids are skipped.
    pub fn get_tasks(&self, ids: &[i64]) -> Result<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM tasks WHERE id IN ({}) ORDER BY id",
            TASK_COLUMNS, placeholders
        );

        let mut stmt = self.db.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_from_iter(ids.iter()), Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }

    /// List all tasks in chronological order.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks ORDER BY date ASC, start_time ASC, id ASC",
            TASK_COLUMNS
        );

        let mut stmt = self.db.prepare(&sql)?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }

    /// List tasks with `start_date <= date <= end_date`.
    pub fn tasks_in_range(&self, start_date: &str, end_date: &str) -> Result<Vec<Task>> {
        let sql = format!(
            r#"
            SELECT {} FROM tasks
            WHERE date >= ? AND date <= ?
            ORDER BY date ASC, start_time ASC, id ASC
            "#,
            TASK_COLUMNS
        );

        let mut stmt = self.db.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![start_date, end_date], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }

    /// Count stored tasks.
    pub fn count_tasks(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Update the merge survivor and delete the absorbed tasks in one transaction.
    pub fn apply_merge(&mut self, survivor: &Task, removed: &[i64]) -> Result<()> {
        let tx = self.db.transaction().context("Failed to begin merge transaction")?;

        if !update_row(&tx, survivor)? {
            eyre::bail!("merge survivor {} vanished during merge", survivor.id);
        }
        for id in removed {
            let n = tx
                .execute("DELETE FROM tasks WHERE id = ?", params![id])
                .context("Failed to delete merged task")?;
            if n == 0 {
                eyre::bail!("merged task {} vanished during merge", id);
            }
        }

        tx.commit().context("Failed to commit merge")?;
        Ok(())
    }

    /// Update the split original and insert the new parts in one transaction.
    pub fn apply_split(&mut self, original: &Task, new_tasks: &[NewTask], now: DateTime<Utc>) -> Result<Vec<Task>> {
        let tx = self.db.transaction().context("Failed to begin split transaction")?;

        if !update_row(&tx, original)? {
            eyre::bail!("split task {} vanished during split", original.id);
        }
        let mut created = Vec::with_capacity(new_tasks.len());
        for new in new_tasks {
            created.push(insert_row(&tx, new, now)?);
        }

        tx.commit().context("Failed to commit split")?;
        Ok(created)
    }

    /// Convert a database row to a Task.
    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(Task {
            id: row.get(0)?,
            date: row.get(1)?,
            start_time: row.get(2)?,
            duration: row.get(3)?,
            title: row.get(4)?,
            location: row.get(5)?,
            description: row.get(6)?,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }
}

fn insert_row(conn: &Connection, new: &NewTask, now: DateTime<Utc>) -> Result<Task> {
    conn.execute(
        r#"
        INSERT INTO tasks (date, start_time, duration, title, location, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            new.date,
            new.start_time,
            new.duration,
            new.title,
            new.location,
            new.description,
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )
    .context("Failed to insert task")?;

    Ok(Task {
        id: conn.last_insert_rowid(),
        date: new.date.clone(),
        start_time: new.start_time.clone(),
        duration: new.duration,
        title: new.title.clone(),
        location: new.location.clone(),
        description: new.description.clone(),
        created_at: now,
        updated_at: now,
    })
}

fn update_row(conn: &Connection, task: &Task) -> Result<bool> {
    let n = conn
        .execute(
            r#"
            UPDATE tasks
            SET date = ?, start_time = ?, duration = ?, title = ?, location = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                task.date,
                task.start_time,
                task.duration,
                task.title,
                task.location,
                task.description,
                task.updated_at.to_rfc3339(),
                task.id,
            ],
        )
        .context("Failed to update task")?;
    Ok(n > 0)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
