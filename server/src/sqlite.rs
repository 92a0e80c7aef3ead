//! SQLite implementation of [`TodoStore`].
//!
//! One connection behind a mutex, shared for the life of the process. Every
//! statement is parameterized; the only SQL assembled at runtime is built
//! from the fixed fragments below.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};

use crate::error::{StoreError, StoreResult};
use crate::models::{Category, Comment, NewTodo, Priority, Todo, TodoPage, TodoPatch, TodoQuery, TodoSummary};
use crate::store::TodoStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    completed BOOLEAN NOT NULL DEFAULT 0,
    category_id INTEGER REFERENCES categories(id),
    priority INTEGER NOT NULL DEFAULT 1 CHECK (priority BETWEEN 1 AND 3),
    created_at TEXT NOT NULL,
    due_date TEXT
);
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    todo_id INTEGER NOT NULL REFERENCES todos(id),
    text TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_todo_id ON comments(todo_id);
";
const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS comments;
DROP TABLE IF EXISTS todos;
DROP TABLE IF EXISTS categories;
";

const SELECT_TODO: &str =
    "SELECT id, text, completed, category_id, priority, created_at, due_date FROM todos WHERE id = ?";
const SELECT_SUMMARIES: &str = "SELECT t.id, t.text, t.completed, t.category_id, t.priority, t.created_at, t.due_date,
    c.name, (SELECT COUNT(*) FROM comments m WHERE m.todo_id = t.id)
    FROM todos t LEFT JOIN categories c ON c.id = t.category_id";
const COUNT_TODOS: &str = "SELECT COUNT(*) FROM todos t";
const ORDER_TODOS: &str = "ORDER BY t.priority DESC, t.created_at DESC, t.id DESC";
const INSERT_TODO: &str =
    "INSERT INTO todos (text, completed, category_id, priority, created_at, due_date) VALUES (?, ?, ?, ?, ?, ?)";
const DELETE_TODO_COMMENTS: &str = "DELETE FROM comments WHERE todo_id = ?";
const DELETE_TODO: &str = "DELETE FROM todos WHERE id = ?";
const TODO_EXISTS: &str = "SELECT 1 FROM todos WHERE id = ?";

const SELECT_CATEGORIES: &str = "SELECT id, name FROM categories ORDER BY name";
const INSERT_CATEGORY: &str = "INSERT INTO categories (name) VALUES (?)";
const UNSET_CATEGORY: &str = "UPDATE todos SET category_id = NULL WHERE category_id = ?";
const DELETE_CATEGORY: &str = "DELETE FROM categories WHERE id = ?";

const SELECT_COMMENTS: &str =
    "SELECT id, todo_id, text, created_at FROM comments WHERE todo_id = ? ORDER BY created_at DESC, id DESC";
const SELECT_COMMENT: &str = "SELECT id, todo_id, text, created_at FROM comments WHERE id = ?";
const INSERT_COMMENT: &str = "INSERT INTO comments (todo_id, text, created_at) VALUES (?, ?, ?)";

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        Priority::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Drops every table and recreates the empty schema.
    pub fn reset(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(DROP_SCHEMA)?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("database schema recreated");
        Ok(())
    }
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        text: row.get(1)?,
        completed: row.get(2)?,
        category_id: row.get(3)?,
        priority: row.get(4)?,
        created_at: row.get(5)?,
        due_date: row.get(6)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<TodoSummary> {
    Ok(TodoSummary {
        todo: todo_from_row(row)?,
        category_name: row.get(7)?,
        comment_count: row.get(8)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn fetch_todo(conn: &Connection, id: i64) -> rusqlite::Result<Option<Todo>> {
    conn.query_row(SELECT_TODO, params![id], todo_from_row).optional()
}

fn insert_todo(conn: &Connection, todo: &NewTodo) -> rusqlite::Result<i64> {
    let created_at = todo.created_at.unwrap_or_else(Utc::now);
    conn.execute(
        INSERT_TODO,
        params![todo.text, todo.completed, todo.category_id, todo.priority, created_at, todo.due_date],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// WHERE clause and bound values for the list filters.
fn filter_clause(query: &TodoQuery) -> (String, Vec<Value>) {
    let mut conditions: Vec<&'static str> = Vec::new();
    let mut values = Vec::new();

    if let Some(search) = &query.search {
        conditions.push("t.text LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(search)));
    }
    if let Some(category_id) = query.category_id {
        conditions.push("t.category_id = ?");
        values.push(Value::Integer(category_id));
    }
    if let Some(priority) = query.priority {
        conditions.push("t.priority = ?");
        values.push(Value::Integer(priority.into()));
    }
    if let Some(completed) = query.completed {
        conditions.push("t.completed = ?");
        values.push(Value::Integer(i64::from(completed)));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

/// SET clause and bound values for a patch, one assignment per present field.
fn patch_assignments(patch: &TodoPatch) -> (Vec<&'static str>, Vec<Value>) {
    let mut assignments = Vec::new();
    let mut values = Vec::new();

    if let Some(text) = &patch.text {
        assignments.push("text = ?");
        values.push(Value::Text(text.clone()));
    }
    if let Some(completed) = patch.completed {
        assignments.push("completed = ?");
        values.push(Value::Integer(i64::from(completed)));
    }
    if let Some(category_id) = patch.category_id {
        assignments.push("category_id = ?");
        values.push(category_id.map_or(Value::Null, Value::Integer));
    }
    if let Some(priority) = patch.priority {
        assignments.push("priority = ?");
        values.push(Value::Integer(priority.into()));
    }
    if let Some(due_date) = patch.due_date {
        assignments.push("due_date = ?");
        values.push(due_date.map_or(Value::Null, |d| Value::Text(d.format("%Y-%m-%d").to_string())));
    }

    (assignments, values)
}

impl TodoStore for SqliteStore {
    fn list_todos(&self, query: &TodoQuery) -> StoreResult<TodoPage> {
        let conn = self.conn.lock();
        let (clause, mut values) = filter_clause(query);

        let total: i64 = conn.query_row(
            &format!("{COUNT_TODOS} {clause}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(query.page_size.into()));
        values.push(Value::Integer(query.offset()));
        let mut stmt = conn.prepare(&format!("{SELECT_SUMMARIES} {clause} {ORDER_TODOS} LIMIT ? OFFSET ?"))?;
        let todos = stmt
            .query_map(params_from_iter(values.iter()), summary_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(TodoPage {
            todos,
            total,
            pages: query.pages(total),
        })
    }

    fn get_todo(&self, id: i64) -> StoreResult<Option<Todo>> {
        let conn = self.conn.lock();
        Ok(fetch_todo(&conn, id)?)
    }

    fn create_todo(&self, todo: &NewTodo) -> StoreResult<Todo> {
        let conn = self.conn.lock();
        let id = insert_todo(&conn, todo)?;
        fetch_todo(&conn, id)?.ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    fn update_todo(&self, id: i64, patch: &TodoPatch) -> StoreResult<Option<Todo>> {
        let conn = self.conn.lock();
        if patch.is_empty() {
            return Ok(fetch_todo(&conn, id)?);
        }

        let (assignments, mut values) = patch_assignments(patch);
        values.push(Value::Integer(id));
        let sql = format!("UPDATE todos SET {} WHERE id = ?", assignments.join(", "));
        if conn.execute(&sql, params_from_iter(values.iter()))? == 0 {
            return Ok(None);
        }
        Ok(fetch_todo(&conn, id)?)
    }

    fn delete_todo(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let comments = conn.execute(DELETE_TODO_COMMENTS, params![id])?;
        let deleted = conn.execute(DELETE_TODO, params![id])? > 0;
        if deleted {
            tracing::debug!(id, comments, "deleted todo and its comments");
        }
        Ok(deleted)
    }

    fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(SELECT_CATEGORIES)?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    fn create_category(&self, name: &str) -> StoreResult<Category> {
        let conn = self.conn.lock();
        match conn.execute(INSERT_CATEGORY, params![name]) {
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::Conflict(format!("category {name:?} already exists")));
            }
            other => other?,
        };
        Ok(Category {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    fn delete_category(&self, id: i64) -> StoreResult<bool> {
        let conn = self.conn.lock();
        conn.execute(UNSET_CATEGORY, params![id])?;
        Ok(conn.execute(DELETE_CATEGORY, params![id])? > 0)
    }

    fn list_comments(&self, todo_id: i64) -> StoreResult<Vec<Comment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(SELECT_COMMENTS)?;
        let comments = stmt
            .query_map(params![todo_id], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    fn add_comment(&self, todo_id: i64, text: &str) -> StoreResult<Option<Comment>> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row(TODO_EXISTS, params![todo_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }
        conn.execute(INSERT_COMMENT, params![todo_id, text, Utc::now()])?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(SELECT_COMMENT, params![id], comment_from_row).optional()?)
    }

    fn export_todos(&self) -> StoreResult<Vec<TodoSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_SUMMARIES} {ORDER_TODOS}"))?;
        let todos = stmt
            .query_map([], summary_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(todos)
    }

    fn import_todos(&self, todos: &[NewTodo]) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for todo in todos {
            insert_todo(&tx, todo)?;
        }
        tx.commit()?;
        Ok(todos.len())
    }
}
