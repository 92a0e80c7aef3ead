//! Request handlers for the `/api` routes.
//!
//! Each handler validates its input, runs one store call on the blocking
//! pool and maps the outcome to JSON. Body and path rejections are turned
//! into `ApiError::Validation` so every failure carries an `{"error"}` body.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, RawQuery, State,
    },
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::error::{ApiError, StoreError, StoreResult};
use crate::export::todos_to_csv;
use crate::models::{
    Category, CategoryInput, Comment, CommentInput, ListParams, MessageResponse, NewTodo, Todo, TodoInput,
    TodoPage, TodoPatchInput, TodoSummary,
};
use crate::store::{SharedStore, TodoStore};

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type IdPath = Result<Path<i64>, PathRejection>;

/// Runs a store call off the async executor.
async fn with_store<T, F>(store: &SharedStore, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn TodoStore) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
        .map_err(ApiError::from)
}

fn body<T>(payload: JsonBody<T>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

fn path_id(path: IdPath) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- todos ---

pub async fn list_todos(
    State(store): State<SharedStore>,
    RawQuery(raw): RawQuery,
) -> Result<Json<TodoPage>, ApiError> {
    let query = ListParams::from_query(raw.as_deref()).into_query();
    tracing::debug!(?query, "listing todos");
    let page = with_store(&store, move |s| s.list_todos(&query)).await?;
    Ok(Json(page))
}

pub async fn get_todo(State(store): State<SharedStore>, id: IdPath) -> Result<Json<Todo>, ApiError> {
    let id = path_id(id)?;
    with_store(&store, move |s| s.get_todo(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("todo"))
}

pub async fn create_todo(
    State(store): State<SharedStore>,
    payload: JsonBody<TodoInput>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let input = body(payload)?.into_new_todo()?;
    let todo = with_store(&store, move |s| s.create_todo(&input)).await?;
    tracing::info!(id = todo.id, priority = todo.priority.get(), "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(store): State<SharedStore>,
    id: IdPath,
    payload: JsonBody<TodoPatchInput>,
) -> Result<Json<Todo>, ApiError> {
    let id = path_id(id)?;
    let patch = body(payload)?.into_patch()?;
    let todo = with_store(&store, move |s| s.update_todo(id, &patch))
        .await?
        .ok_or(ApiError::NotFound("todo"))?;
    tracing::info!(id, completed = todo.completed, "todo updated");
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(store): State<SharedStore>,
    id: IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = path_id(id)?;
    if !with_store(&store, move |s| s.delete_todo(id)).await? {
        return Err(ApiError::NotFound("todo"));
    }
    tracing::info!(id, "todo deleted");
    Ok(Json(MessageResponse::new("Todo deleted successfully")))
}

// --- categories ---

pub async fn list_categories(State(store): State<SharedStore>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = with_store(&store, |s| s.list_categories()).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(store): State<SharedStore>,
    payload: JsonBody<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let name = body(payload)?.into_name()?;
    let category = with_store(&store, move |s| s.create_category(&name)).await?;
    tracing::info!(id = category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(store): State<SharedStore>,
    id: IdPath,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = path_id(id)?;
    if !with_store(&store, move |s| s.delete_category(id)).await? {
        return Err(ApiError::NotFound("category"));
    }
    tracing::info!(id, "category deleted");
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

// --- comments ---

pub async fn list_comments(
    State(store): State<SharedStore>,
    todo_id: IdPath,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let todo_id = path_id(todo_id)?;
    let comments = with_store(&store, move |s| s.list_comments(todo_id)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(store): State<SharedStore>,
    todo_id: IdPath,
    payload: JsonBody<CommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let todo_id = path_id(todo_id)?;
    let text = body(payload)?.into_text()?;
    let comment = with_store(&store, move |s| s.add_comment(todo_id, &text))
        .await?
        .ok_or(ApiError::NotFound("todo"))?;
    tracing::info!(id = comment.id, todo_id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}

// --- import / export ---

pub async fn export_csv(State(store): State<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    let todos = with_store(&store, |s| s.export_todos()).await?;
    let bytes = todos_to_csv(&todos)?;
    tracing::info!(rows = todos.len(), "exported csv");
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"todos.csv\""),
        ],
        bytes,
    ))
}

pub async fn export_json(State(store): State<SharedStore>) -> Result<Json<Vec<TodoSummary>>, ApiError> {
    let todos = with_store(&store, |s| s.export_todos()).await?;
    tracing::info!(rows = todos.len(), "exported json");
    Ok(Json(todos))
}

pub async fn import_json(
    State(store): State<SharedStore>,
    payload: JsonBody<Vec<TodoInput>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let records = body(payload)?;
    let todos = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            record.into_imported_todo().map_err(|err| match err {
                ApiError::Validation(msg) => ApiError::Validation(format!("record {i}: {msg}")),
                other => other,
            })
        })
        .collect::<Result<Vec<NewTodo>, ApiError>>()?;

    let imported = with_store(&store, move |s| s.import_todos(&todos)).await?;
    tracing::info!(imported, "imported todos");
    Ok(Json(MessageResponse {
        message: "Todos imported successfully".to_string(),
        imported: Some(imported),
    }))
}
