//! Records stored by the service and the request payloads that create or
//! change them.
//!
//! Request payloads are deserialized loosely (`serde_json::Value` per field)
//! and then validated into typed inputs, so a bad field yields a 400 with a
//! readable message instead of a generic body rejection.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Task priority, always 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Priority(u8);

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const MEDIUM: Priority = Priority(2);
    pub const HIGH: Priority = Priority(3);

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::LOW
    }
}

impl TryFrom<i64> for Priority {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Priority(value as u8)),
            other => Err(format!("priority must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<Priority> for i64 {
    fn from(p: Priority) -> i64 {
        i64::from(p.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub category_id: Option<i64>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
}

/// A todo joined with its category name and comment count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoSummary {
    #[serde(flatten)]
    pub todo: Todo,
    pub category_name: Option<String>,
    pub comment_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub todo_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One page of the filtered todo list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TodoPage {
    pub todos: Vec<TodoSummary>,
    pub total: i64,
    pub pages: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            imported: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated inputs handed to the store
// ---------------------------------------------------------------------------

/// A todo ready to insert.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTodo {
    pub text: String,
    pub completed: bool,
    pub category_id: Option<i64>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    /// Insert time; `None` means now. Set by imports that carry a timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

/// The fields a PUT changes. `None` leaves a column alone; for nullable
/// columns `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub category_id: Option<Option<i64>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.completed.is_none()
            && self.category_id.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

/// Filters and paging for the todo list.
#[derive(Clone, Debug, PartialEq)]
pub struct TodoQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl Default for TodoQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            category_id: None,
            priority: None,
            completed: None,
        }
    }
}

impl TodoQuery {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn pages(&self, total: i64) -> i64 {
        let size = i64::from(self.page_size);
        (total + size - 1) / size
    }
}

// ---------------------------------------------------------------------------
// Raw request payloads
// ---------------------------------------------------------------------------

/// Query string of `GET /api/todos`. Every value is kept as text; malformed
/// values fall back to defaults instead of failing the request.
#[derive(Debug, Default, PartialEq)]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub completed: Option<String>,
}

impl ListParams {
    /// Reads a raw query string. A repeated key keeps its last value, and
    /// `pageSize` and `limit` are aliases of `page_size`. Unknown keys are
    /// ignored.
    pub fn from_query(raw: Option<&str>) -> Self {
        let pairs: Vec<(String, String)> = raw
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "page_size" | "pageSize" | "limit" => &mut params.page_size,
                "search" => &mut params.search,
                "category" => &mut params.category,
                "priority" => &mut params.priority,
                "completed" => &mut params.completed,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }

    pub fn into_query(self) -> TodoQuery {
        let page = positive(self.page.as_deref()).unwrap_or(1);
        let page_size = positive(self.page_size.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        TodoQuery {
            page,
            page_size,
            search: self.search.filter(|s| !s.is_empty()),
            category_id: self.category.as_deref().and_then(|s| s.trim().parse().ok()),
            priority: self
                .priority
                .as_deref()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .and_then(|p| Priority::try_from(p).ok()),
            completed: self.completed.as_deref().and_then(parse_flag),
        }
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|n| *n > 0)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Body of `POST /api/todos` and one element of `POST /api/import/json`.
///
/// `completed` and `created_at` are only honoured on import. Unknown keys such
/// as `id`, `category_name` or `comment_count` from an export are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TodoInput {
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub completed: Option<Value>,
    #[serde(default)]
    pub category_id: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub due_date: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
}

impl TodoInput {
    /// Validates a create request. `completed` and `created_at` are dropped.
    pub fn into_new_todo(self) -> Result<NewTodo, ApiError> {
        let mut todo = self.into_imported_todo()?;
        todo.completed = false;
        todo.created_at = None;
        Ok(todo)
    }

    /// Validates an imported record, keeping every field that is present.
    pub fn into_imported_todo(self) -> Result<NewTodo, ApiError> {
        let text = parse_text(self.text, "text")?;
        let priority = match self.priority {
            None | Some(Value::Null) => Priority::default(),
            Some(v) => parse_priority(&v)?,
        };
        let completed = match self.completed {
            None | Some(Value::Null) => false,
            Some(v) => parse_completed(&v)?,
        };
        let created_at = match self.created_at {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_timestamp(&v)?),
        };
        Ok(NewTodo {
            text,
            completed,
            category_id: self.category_id.as_ref().and_then(coerce_id),
            priority,
            due_date: match self.due_date {
                None => None,
                Some(v) => parse_due_date(&v)?,
            },
            created_at,
        })
    }
}

/// Body of `PUT /api/todos/{id}`. An explicit `null` is kept as
/// `Some(Value::Null)` so it can clear nullable columns.
#[derive(Debug, Default, Deserialize)]
pub struct TodoPatchInput {
    #[serde(default, deserialize_with = "present")]
    pub text: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub completed: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Value>,
}

impl TodoPatchInput {
    pub fn into_patch(self) -> Result<TodoPatch, ApiError> {
        Ok(TodoPatch {
            text: self.text.map(|v| parse_text(Some(v), "text")).transpose()?,
            completed: self.completed.as_ref().map(parse_completed).transpose()?,
            category_id: self.category_id.as_ref().map(coerce_id),
            priority: self.priority.as_ref().map(parse_priority).transpose()?,
            due_date: self.due_date.as_ref().map(parse_due_date).transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: Option<String>,
}

impl CategoryInput {
    pub fn into_name(self) -> Result<String, ApiError> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ApiError::validation("category name is required")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub text: Option<Value>,
}

impl CommentInput {
    pub fn into_text(self) -> Result<String, ApiError> {
        parse_text(self.text, "comment text")
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn parse_text(value: Option<Value>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(ApiError::validation(format!("{field} is required")))
        }
        Some(_) => Err(ApiError::validation(format!("{field} must be a string"))),
    }
}

/// Accepts an integer or a numeric string in 1..=3.
pub fn parse_priority(value: &Value) -> Result<Priority, ApiError> {
    let raw = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let raw = raw.ok_or_else(|| ApiError::validation(format!("priority must be 1, 2 or 3 (got {value})")))?;
    Priority::try_from(raw).map_err(ApiError::Validation)
}

fn parse_completed(value: &Value) -> Result<bool, ApiError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        other => Err(ApiError::validation(format!("completed must be a boolean (got {other})"))),
    }
}

/// Integers and numeric strings become an id; anything else is null.
fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_due_date(value: &Value) -> Result<Option<NaiveDate>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
                .map(Some)
                .map_err(|_| ApiError::validation(format!("due_date must be YYYY-MM-DD (got {s:?})")))
        }
        other => Err(ApiError::validation(format!("due_date must be a string (got {other})"))),
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ApiError> {
    let Value::String(s) = value else {
        return Err(ApiError::validation(format!("created_at must be a string (got {value})")));
    };
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()))
        .map_err(|_| ApiError::validation(format!("created_at is not a timestamp (got {s:?})")))
}
