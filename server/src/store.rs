//! The persistence seam. Handlers only see `dyn TodoStore`, so tests can swap
//! in a double; production uses [`crate::sqlite::SqliteStore`].

use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::{Category, Comment, NewTodo, Todo, TodoPage, TodoPatch, TodoQuery, TodoSummary};

/// Data access for categories, todos and comments.
///
/// Calls are synchronous; async handlers run them on the blocking pool.
/// Lookups by id return `Ok(None)` / `Ok(false)` when nothing matched so the
/// HTTP layer decides how to report it.
pub trait TodoStore: Send + Sync {
    fn list_todos(&self, query: &TodoQuery) -> StoreResult<TodoPage>;

    fn get_todo(&self, id: i64) -> StoreResult<Option<Todo>>;

    fn create_todo(&self, todo: &NewTodo) -> StoreResult<Todo>;

    /// Applies only the fields present in `patch`. `None` when `id` is unknown.
    fn update_todo(&self, id: i64, patch: &TodoPatch) -> StoreResult<Option<Todo>>;

    /// Removes the todo's comments, then the todo. `false` when `id` is unknown.
    fn delete_todo(&self, id: i64) -> StoreResult<bool>;

    fn list_categories(&self) -> StoreResult<Vec<Category>>;

    /// Fails with `StoreError::Conflict` when the name is taken.
    fn create_category(&self, name: &str) -> StoreResult<Category>;

    /// Clears `category_id` on referencing todos, then removes the category.
    fn delete_category(&self, id: i64) -> StoreResult<bool>;

    /// Newest first. Empty for unknown todos.
    fn list_comments(&self, todo_id: i64) -> StoreResult<Vec<Comment>>;

    /// `None` when the todo does not exist.
    fn add_comment(&self, todo_id: i64, text: &str) -> StoreResult<Option<Comment>>;

    /// Every todo with its join columns, in list order.
    fn export_todos(&self) -> StoreResult<Vec<TodoSummary>>;

    /// Inserts each record and returns how many were written.
    fn import_todos(&self, todos: &[NewTodo]) -> StoreResult<usize>;
}

pub type SharedStore = Arc<dyn TodoStore>;
