//! Domain DTOs for the todo API.
//!
//! # Design
//! These mirror the server's JSON but are defined independently, so the
//! client never links against server internals. The end-to-end test in
//! `tests/integration.rs` catches schema drift between the two crates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A todo as returned by create, get and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub category_id: Option<i64>,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
}

/// A todo as returned by list and export: joined with its category name
/// and comment count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    #[serde(flatten)]
    pub todo: Todo,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub todo_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPage {
    pub todos: Vec<TodoItem>,
    pub total: i64,
    pub pages: i64,
}

/// `{"message": ...}` acknowledgement from delete and import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message: String,
    #[serde(default)]
    pub imported: Option<usize>,
}

/// Request payload for creating a new todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodo {
    pub text: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl CreateTodo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category_id: None,
            priority: None,
            due_date: None,
        }
    }
}

/// Request payload for updating an existing todo. Only fields that are
/// `Some` are sent; for the nullable columns `Some(None)` sends `null`,
/// which clears the value on the server.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateTodo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTodo {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// Filters and paging for the todo list. Unset filters are left out of
/// the query string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "category", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: None,
            category_id: None,
            priority: None,
            completed: None,
        }
    }
}
