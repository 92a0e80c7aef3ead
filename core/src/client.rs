//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip, keeping the core
//! deterministic and free of I/O dependencies.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Category, Comment, CreateTodo, ListParams, Message, Todo, TodoItem, TodoPage, UpdateTodo};

/// Synchronous, stateless client for the `/api` surface.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    /// `base_url` is the server root; `/api` is appended by the builders.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    // --- todos ---

    pub fn build_list_todos(&self, params: &ListParams) -> Result<HttpRequest, ApiError> {
        let query = serde_urlencoded::to_string(params).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::without_body(
            HttpMethod::Get,
            format!("{}?{query}", self.url("/todos")),
        ))
    }

    pub fn build_get_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.url(&format!("/todos/{id}")))
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::with_json(HttpMethod::Post, self.url("/todos"), to_json(input)?))
    }

    pub fn build_update_todo(&self, id: i64, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::with_json(
            HttpMethod::Put,
            self.url(&format!("/todos/{id}")),
            to_json(input)?,
        ))
    }

    pub fn build_delete_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Delete, self.url(&format!("/todos/{id}")))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<TodoPage, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 201)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<Message, ApiError> {
        parse_json(response, 200)
    }

    // --- categories ---

    pub fn build_list_categories(&self) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.url("/categories"))
    }

    pub fn build_create_category(&self, name: &str) -> Result<HttpRequest, ApiError> {
        let body = to_json(&serde_json::json!({ "name": name }))?;
        Ok(HttpRequest::with_json(HttpMethod::Post, self.url("/categories"), body))
    }

    pub fn build_delete_category(&self, id: i64) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Delete, self.url(&format!("/categories/{id}")))
    }

    pub fn parse_list_categories(&self, response: HttpResponse) -> Result<Vec<Category>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_category(&self, response: HttpResponse) -> Result<Category, ApiError> {
        parse_json(response, 201)
    }

    pub fn parse_delete_category(&self, response: HttpResponse) -> Result<Message, ApiError> {
        parse_json(response, 200)
    }

    // --- comments ---

    pub fn build_list_comments(&self, todo_id: i64) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.url(&format!("/todos/{todo_id}/comments")))
    }

    pub fn build_add_comment(&self, todo_id: i64, text: &str) -> Result<HttpRequest, ApiError> {
        let body = to_json(&serde_json::json!({ "text": text }))?;
        Ok(HttpRequest::with_json(
            HttpMethod::Post,
            self.url(&format!("/todos/{todo_id}/comments")),
            body,
        ))
    }

    pub fn parse_list_comments(&self, response: HttpResponse) -> Result<Vec<Comment>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_add_comment(&self, response: HttpResponse) -> Result<Comment, ApiError> {
        parse_json(response, 201)
    }

    // --- import / export ---

    pub fn build_export_csv(&self) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.url("/export/csv"))
    }

    pub fn build_export_json(&self) -> HttpRequest {
        HttpRequest::without_body(HttpMethod::Get, self.url("/export/json"))
    }

    /// `document` is the raw text of a previously exported JSON file. It is
    /// checked to be a JSON array before anything is sent.
    pub fn build_import_json(&self, document: &str) -> Result<HttpRequest, ApiError> {
        let todos: Vec<serde_json::Value> =
            serde_json::from_str(document).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::with_json(HttpMethod::Post, self.url("/import/json"), to_json(&todos)?))
    }

    /// Returns the CSV text of the download.
    pub fn parse_export_csv(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        Ok(response.body)
    }

    pub fn parse_export_json(&self, response: HttpResponse) -> Result<Vec<TodoItem>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_import_json(&self, response: HttpResponse) -> Result<Message, ApiError> {
        parse_json(response, 200)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse, expected: u16) -> Result<T, ApiError> {
    check_status(&response, expected)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        s if s == expected => Ok(()),
        404 => Err(ApiError::NotFound),
        400 => Err(ApiError::BadRequest(error_message(&response.body))),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Pulls `error` out of a `{"error": "..."}` body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:5001")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    const TODO_JSON: &str = r#"{"id":1,"text":"Test","completed":false,"category_id":null,"priority":1,"created_at":"2025-01-01T10:00:00Z","due_date":null}"#;

    #[test]
    fn build_list_todos_default_query() {
        let req = client().build_list_todos(&ListParams::default()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:5001/api/todos?page=1&page_size=10");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_list_todos_encodes_filters() {
        let params = ListParams {
            page: 2,
            search: Some("milk & eggs".to_string()),
            category_id: Some(4),
            completed: Some(false),
            ..ListParams::default()
        };
        let req = client().build_list_todos(&params).unwrap();
        assert_eq!(
            req.path,
            "http://localhost:5001/api/todos?page=2&page_size=10&search=milk+%26+eggs&category=4&completed=false"
        );
    }

    #[test]
    fn build_create_todo_produces_correct_request() {
        let input = CreateTodo {
            priority: Some(2),
            ..CreateTodo::new("Buy milk")
        };
        let req = client().build_create_todo(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:5001/api/todos");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["text"], "Buy milk");
        assert_eq!(body["priority"], 2);
        assert!(body["category_id"].is_null());
    }

    #[test]
    fn build_update_todo_sends_only_present_fields() {
        let req = client().build_update_todo(7, &UpdateTodo::completed(true)).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:5001/api/todos/7");
        assert_eq!(req.body.as_deref(), Some(r#"{"completed":true}"#));
    }

    #[test]
    fn build_update_todo_can_clear_category() {
        let input = UpdateTodo {
            category_id: Some(None),
            ..UpdateTodo::default()
        };
        let req = client().build_update_todo(7, &input).unwrap();
        assert_eq!(req.body.as_deref(), Some(r#"{"category_id":null}"#));
    }

    #[test]
    fn build_comment_requests() {
        let c = client();
        assert_eq!(c.build_list_comments(3).path, "http://localhost:5001/api/todos/3/comments");
        let req = c.build_add_comment(3, "hi").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.as_deref(), Some(r#"{"text":"hi"}"#));
    }

    #[test]
    fn build_import_rejects_non_array_documents() {
        let err = client().build_import_json(r#"{"text":"x"}"#).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
        let req = client().build_import_json(r#"[{"text":"x"}]"#).unwrap();
        assert_eq!(req.path, "http://localhost:5001/api/import/json");
    }

    #[test]
    fn parse_create_todo_success() {
        let todo = client().parse_create_todo(response(201, TODO_JSON)).unwrap();
        assert_eq!(todo.text, "Test");
        assert_eq!(todo.priority, 1);
    }

    #[test]
    fn parse_create_todo_bad_request_extracts_message() {
        let err = client()
            .parse_create_todo(response(400, r#"{"error":"text is required"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "text is required"));
    }

    #[test]
    fn parse_update_todo_not_found() {
        let err = client().parse_update_todo(response(404, r#"{"error":"todo not found"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_list_todos_with_join_columns() {
        let body = format!(
            r#"{{"todos":[{}],"total":1,"pages":1}}"#,
            TODO_JSON.replace('}', r#","category_name":"Work","comment_count":2}"#)
        );
        let page = client().parse_list_todos(response(200, &body)).unwrap();
        assert_eq!(page.todos[0].category_name.as_deref(), Some("Work"));
        assert_eq!(page.todos[0].comment_count, 2);
    }

    #[test]
    fn parse_server_error() {
        let err = client().parse_list_categories(response(500, r#"{"error":"disk I/O error"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_list_todos_bad_json() {
        let err = client().parse_list_todos(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn parse_export_csv_returns_text() {
        let csv = client().parse_export_csv(response(200, "ID,Task\n")).unwrap();
        assert_eq!(csv, "ID,Task\n");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:5001/");
        assert_eq!(client.build_list_categories().path, "http://localhost:5001/api/categories");
    }
}
