use crate::error::{LensError, Result};
use crate::models::{List, Task, TaskRecord};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS lists (
    listid   TEXT NOT NULL,
    listname TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    listid       TEXT NOT NULL,
    taskseriesid TEXT NOT NULL,
    taskid       TEXT NOT NULL,
    completed    TEXT NOT NULL,
    name         TEXT NOT NULL,
    due          TEXT NOT NULL,
    priority     TEXT NOT NULL
);
";

const RECORD_COLUMNS: &str = "tasks.listid, tasks.taskseriesid, tasks.taskid, tasks.name, \
     tasks.due, tasks.priority, tasks.completed, lists.listname";

/// Columns a query may be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskColumn {
    Name,
    Due,
    Priority,
}

impl TaskColumn {
    fn sql(&self) -> &'static str {
        match self {
            TaskColumn::Name => "tasks.name",
            TaskColumn::Due => "tasks.due",
            TaskColumn::Priority => "tasks.priority",
        }
    }
}

/// Local snapshot of lists and tasks. Tables are only ever replaced whole.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn replace_lists(&mut self, lists: &[List]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM lists", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO lists (listid, listname) VALUES (?1, ?2)")?;
            for list in lists {
                stmt.execute(params![list.id, list.name])?;
            }
        }
        tx.commit()?;
        log::debug!("Cached {} lists", lists.len());
        Ok(())
    }

    pub fn replace_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (listid, taskseriesid, taskid, completed, name, due, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for task in tasks {
                stmt.execute(params![
                    task.list_id,
                    task.task_series_id,
                    task.task_id,
                    task.completed,
                    task.name,
                    task.due,
                    task.priority.code(),
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("Cached {} tasks", tasks.len());
        Ok(())
    }

    /// Tasks joined with their list, optionally narrowed to one list name.
    pub fn query(
        &self,
        category: Option<&str>,
        order_by: Option<TaskColumn>,
        include_completed: bool,
    ) -> Result<Vec<TaskRecord>> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM tasks INNER JOIN lists ON tasks.listid = lists.listid WHERE 1 = 1"
        );
        if !include_completed {
            sql.push_str(" AND tasks.completed = ''");
        }
        if category.is_some() {
            sql.push_str(" AND lists.listname = ?1");
        }
        if let Some(column) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(column.sql());
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match category {
            Some(name) => stmt.query_map(params![name], record_from_row)?,
            None => stmt.query_map([], record_from_row)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn find_by_id(
        &self,
        task_id: &str,
        list_id: &str,
        task_series_id: &str,
    ) -> Result<TaskRecord> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM tasks INNER JOIN lists ON tasks.listid = lists.listid
             WHERE tasks.listid = ?1 AND tasks.taskseriesid = ?2 AND tasks.taskid = ?3"
        );
        self.conn
            .query_row(&sql, params![list_id, task_series_id, task_id], record_from_row)
            .optional()?
            .ok_or_else(|| LensError::NotFound {
                task_id: task_id.to_string(),
                list_id: list_id.to_string(),
                task_series_id: task_series_id.to_string(),
            })
    }

    #[cfg(test)]
    pub fn list_name(&self, list_id: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT listname FROM lists WHERE listid = ?1",
                params![list_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LensError::UnknownList(list_id.to_string()))
    }

    pub fn list_id(&self, list_name: &str) -> Result<String> {
        self.conn
            .query_row(
                "SELECT listid FROM lists WHERE listname = ?1",
                params![list_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LensError::UnknownList(list_name.to_string()))
    }

    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT listname FROM lists ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        list_id: row.get(0)?,
        task_series_id: row.get(1)?,
        task_id: row.get(2)?,
        name: row.get(3)?,
        due: row.get(4)?,
        priority: row.get(5)?,
        completed: row.get(6)?,
        list_name: row.get(7)?,
    })
}
