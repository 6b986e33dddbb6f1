//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide fetch-by-filter, insert, update, bulk patch and delete over the
//!   `tasks` table.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Whole-record writes call `Task::validate()` before SQL mutations.
//!   Placement writes and cascaded start dates skip it, so a cascade may
//!   leave `start_date > due_date` on a descendant.
//! - Bulk patches and reschedules are all-or-nothing (one `IMMEDIATE`
//!   transaction).
//! - `root_id` and `origin` are written once at insert and never updated.
//! - Listing order is deterministic: `COALESCE(position, 0) ASC, created_at
//!   ASC, id ASC`.
//! - Deleting a task leaves its children in place (they become orphans).

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::task::{Task, TaskId, TaskOrigin, TaskValidationError};
use crate::tree::cascade::DateDelta;
use crate::tree::position::PositionUpdate;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    parent_task_id,
    root_id,
    position,
    origin,
    start_date,
    due_date
FROM tasks";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result type used by task repository operations.
pub type TaskRepoResult<T> = Result<T, TaskRepoError>;

/// Errors from task repository operations.
#[derive(Debug)]
pub enum TaskRepoError {
    /// Record failed write-path validation.
    Validation(TaskValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target task does not exist.
    NotFound(TaskId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid task.
    InvalidData(String),
}

impl Display for TaskRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "task repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "task repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for TaskRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for TaskRepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for TaskRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TaskRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Parent predicate for task listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// No parent constraint.
    #[default]
    Any,
    /// Only tasks without a parent.
    Root,
    /// Only direct children of one task.
    Child(TaskId),
}

impl ParentFilter {
    /// Filter selecting the sibling group under `parent`.
    pub fn siblings_of(parent: Option<TaskId>) -> Self {
        match parent {
            Some(parent_id) => Self::Child(parent_id),
            None => Self::Root,
        }
    }
}

/// Query options for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskListQuery {
    pub root_id: Option<TaskId>,
    pub parent: ParentFilter,
    pub origin: Option<TaskOrigin>,
}

impl TaskListQuery {
    /// Every task of one project/template tree, root included.
    pub fn tree(root_id: TaskId) -> Self {
        Self {
            root_id: Some(root_id),
            ..Self::default()
        }
    }

    /// One sibling group, scoped by origin.
    pub fn siblings(parent: Option<TaskId>, origin: TaskOrigin) -> Self {
        Self {
            root_id: None,
            parent: ParentFilter::siblings_of(parent),
            origin: Some(origin),
        }
    }
}

/// Storage contract used by task use-cases.
pub trait TaskRepository {
    /// Inserts one task.
    fn create_task(&self, task: &Task) -> TaskRepoResult<TaskId>;
    /// Loads one task by id.
    fn get_task(&self, id: TaskId) -> TaskRepoResult<Option<Task>>;
    /// Lists tasks matching all filters.
    fn list_tasks(&self, query: &TaskListQuery) -> TaskRepoResult<Vec<Task>>;
    /// Updates title, parent, position and dates of one task.
    fn update_task(&self, task: &Task) -> TaskRepoResult<()>;
    /// Writes only parent and position of one task; dates are not checked.
    fn update_placement(
        &self,
        id: TaskId,
        parent_task_id: Option<TaskId>,
        position: f64,
    ) -> TaskRepoResult<()>;
    /// Writes many positions atomically.
    fn update_positions(&self, updates: &[PositionUpdate]) -> TaskRepoResult<()>;
    /// Writes one task's dates and its descendants' start dates atomically.
    fn reschedule_task(&self, task: &Task, deltas: &[DateDelta]) -> TaskRepoResult<()>;
    /// Removes one task. Children are left untouched.
    fn delete_task(&self, id: TaskId) -> TaskRepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TaskRepoResult<Self> {
        ensure_task_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> TaskRepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                title,
                parent_task_id,
                root_id,
                position,
                origin,
                start_date,
                due_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.parent_task_id.map(|value| value.to_string()),
                task.root_id.to_string(),
                task.position,
                task.origin.as_str(),
                task.start_date.map(date_to_db),
                task.due_date.map(date_to_db),
            ],
        )?;

        Ok(task.id)
    }

    fn get_task(&self, id: TaskId) -> TaskRepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> TaskRepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(root_id) = query.root_id {
            sql.push_str(" AND root_id = ?");
            bind_values.push(Value::Text(root_id.to_string()));
        }

        match query.parent {
            ParentFilter::Any => {}
            ParentFilter::Root => sql.push_str(" AND parent_task_id IS NULL"),
            ParentFilter::Child(parent_id) => {
                sql.push_str(" AND parent_task_id = ?");
                bind_values.push(Value::Text(parent_id.to_string()));
            }
        }

        if let Some(origin) = query.origin {
            sql.push_str(" AND origin = ?");
            bind_values.push(Value::Text(origin.as_str().to_string()));
        }

        sql.push_str(" ORDER BY COALESCE(position, 0) ASC, created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> TaskRepoResult<()> {
        task.validate()?;
        write_task_row(self.conn, task)
    }

    fn update_placement(
        &self,
        id: TaskId,
        parent_task_id: Option<TaskId>,
        position: f64,
    ) -> TaskRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET parent_task_id = ?2,
                 position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                parent_task_id.map(|value| value.to_string()),
                position,
            ],
        )?;
        if changed == 0 {
            return Err(TaskRepoError::NotFound(id));
        }
        Ok(())
    }

    fn update_positions(&self, updates: &[PositionUpdate]) -> TaskRepoResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for update in updates {
            let changed = tx.execute(
                "UPDATE tasks
                 SET position = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![update.id.to_string(), update.position],
            )?;
            if changed == 0 {
                return Err(TaskRepoError::NotFound(update.id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn reschedule_task(&self, task: &Task, deltas: &[DateDelta]) -> TaskRepoResult<()> {
        task.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        write_task_row(&tx, task)?;
        for delta in deltas {
            let changed = tx.execute(
                "UPDATE tasks
                 SET start_date = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![delta.id.to_string(), date_to_db(delta.start_date)],
            )?;
            if changed == 0 {
                return Err(TaskRepoError::NotFound(delta.id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> TaskRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(TaskRepoError::NotFound(id));
        }
        Ok(())
    }
}

fn write_task_row(conn: &Connection, task: &Task) -> TaskRepoResult<()> {
    let changed = conn.execute(
        "UPDATE tasks
         SET
            title = ?2,
            parent_task_id = ?3,
            position = ?4,
            start_date = ?5,
            due_date = ?6,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            task.id.to_string(),
            task.title.as_str(),
            task.parent_task_id.map(|value| value.to_string()),
            task.position,
            task.start_date.map(date_to_db),
            task.due_date.map(date_to_db),
        ],
    )?;

    if changed == 0 {
        return Err(TaskRepoError::NotFound(task.id));
    }
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> TaskRepoResult<Task> {
    let id_text: String = row.get("id")?;
    let root_text: String = row.get("root_id")?;
    let parent_task_id = row
        .get::<_, Option<String>>("parent_task_id")?
        .map(|value| parse_uuid(&value, "tasks.parent_task_id"))
        .transpose()?;

    let origin_text: String = row.get("origin")?;
    let origin = TaskOrigin::parse(&origin_text).ok_or_else(|| {
        TaskRepoError::InvalidData(format!("invalid origin `{origin_text}` in tasks.origin"))
    })?;

    let start_date = row
        .get::<_, Option<String>>("start_date")?
        .map(|value| parse_date(&value, "tasks.start_date"))
        .transpose()?;
    let due_date = row
        .get::<_, Option<String>>("due_date")?
        .map(|value| parse_date(&value, "tasks.due_date"))
        .transpose()?;

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        title: row.get("title")?,
        parent_task_id,
        root_id: parse_uuid(&root_text, "tasks.root_id")?,
        position: row.get("position")?,
        origin,
        start_date,
        due_date,
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str, column: &'static str) -> TaskRepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| TaskRepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn parse_uuid(value: &str, column: &'static str) -> TaskRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TaskRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_task_connection_ready(conn: &Connection) -> TaskRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(TaskRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "tasks")? {
        return Err(TaskRepoError::MissingRequiredTable("tasks"));
    }

    for column in [
        "id",
        "title",
        "parent_task_id",
        "root_id",
        "position",
        "origin",
        "start_date",
        "due_date",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "tasks", column)? {
            return Err(TaskRepoError::MissingRequiredColumn {
                table: "tasks",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TaskRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> TaskRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
