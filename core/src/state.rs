//! View-state machine for the todo client.
//!
//! # Design
//! `ViewState` never performs I/O. Every transition that needs the server
//! returns an [`Outgoing`]: a [`Ticket`] plus the `HttpRequest` to execute.
//! The host runs the request and hands the response back to
//! [`ViewState::apply`] together with the ticket.
//!
//! List fetches (todos, categories, comments) carry a sequence number. Only
//! the most recently issued fetch of each list may land; an older response
//! that arrives late is reported as [`Applied::Stale`] and dropped.
//!
//! Mutations change local state only after the server confirms them, using
//! the record the server returned.

use std::cmp::Reverse;
use std::time::Instant;

use crate::client::TodoClient;
use crate::debounce::SearchDebouncer;
use crate::error::{ApiError, PreferenceError};
use crate::http::{HttpRequest, HttpResponse};
use crate::prefs::{PreferenceStore, Preferences};
use crate::types::{Category, Comment, CreateTodo, ListParams, Todo, TodoItem, UpdateTodo};

pub const FETCH_TODOS_FAILED: &str = "Failed to fetch todos. Please refresh the page.";
pub const ADD_TODO_FAILED: &str = "Failed to add todo. Please try again.";
pub const UPDATE_TODO_FAILED: &str = "Failed to update todo.";
pub const DELETE_TODO_FAILED: &str = "Failed to delete todo.";
pub const ADD_COMMENT_FAILED: &str = "Failed to add comment. Please try again.";
pub const IMPORT_FAILED: &str = "Failed to import todos.";

/// Identifies the operation a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ticket {
    Todos { seq: u64 },
    Categories { seq: u64 },
    Comments { todo_id: i64, seq: u64 },
    CreateTodo,
    UpdateTodo { id: i64 },
    DeleteTodo { id: i64 },
    CreateCategory,
    DeleteCategory { id: i64 },
    AddComment { todo_id: i64 },
    Import,
}

/// A request the host should execute, tagged with its ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub ticket: Ticket,
    pub request: HttpRequest,
}

/// What [`ViewState::apply`] did with a successful or superseded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// A newer fetch of the same list was issued after this one.
    Stale,
    /// State changed and the todo list must be fetched again.
    Refetch(Outgoing),
}

#[derive(Debug, Clone)]
pub struct ViewState {
    client: TodoClient,
    todos: Vec<TodoItem>,
    categories: Vec<Category>,
    comments: Vec<Comment>,
    selected: Option<TodoItem>,
    params: ListParams,
    total: i64,
    total_pages: i64,
    prefs: Preferences,
    notice: Option<String>,
    loading: bool,
    debouncer: SearchDebouncer,
    todos_seq: u64,
    categories_seq: u64,
    comments_seq: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

fn sort_key(item: &TodoItem) -> (Reverse<u8>, Reverse<chrono::DateTime<chrono::Utc>>, Reverse<i64>) {
    (
        Reverse(item.todo.priority),
        Reverse(item.todo.created_at),
        Reverse(item.todo.id),
    )
}

impl ViewState {
    pub fn new(client: TodoClient, prefs: Preferences) -> Self {
        Self {
            client,
            todos: Vec::new(),
            categories: Vec::new(),
            comments: Vec::new(),
            selected: None,
            params: ListParams::default(),
            total: 0,
            total_pages: 1,
            prefs,
            notice: None,
            loading: false,
            debouncer: SearchDebouncer::default(),
            todos_seq: 0,
            categories_seq: 0,
            comments_seq: 0,
        }
    }

    pub fn with_debouncer(mut self, debouncer: SearchDebouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    // --- accessors ---

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn selected(&self) -> Option<&TodoItem> {
        self.selected.as_ref()
    }

    pub fn params(&self) -> &ListParams {
        &self.params
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn total_pages(&self) -> i64 {
        self.total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns and clears the pending user-facing notice.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn dark_mode(&self) -> bool {
        self.prefs.dark_mode
    }

    pub fn body_class(&self) -> &'static str {
        self.prefs.body_class()
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    // --- fetches ---

    /// Initial load: the todo list and the categories.
    pub fn load(&mut self) -> Result<Vec<Outgoing>, ApiError> {
        self.loading = true;
        Ok(vec![self.refresh_todos()?, self.refresh_categories()])
    }

    pub fn refresh_todos(&mut self) -> Result<Outgoing, ApiError> {
        let request = self.client.build_list_todos(&self.params)?;
        let seq = bump(&mut self.todos_seq);
        Ok(Outgoing {
            ticket: Ticket::Todos { seq },
            request,
        })
    }

    pub fn refresh_categories(&mut self) -> Outgoing {
        let seq = bump(&mut self.categories_seq);
        Outgoing {
            ticket: Ticket::Categories { seq },
            request: self.client.build_list_categories(),
        }
    }

    // --- filters and paging ---

    /// Moves to `page`, clamped to the known page range.
    pub fn set_page(&mut self, page: u32) -> Result<Outgoing, ApiError> {
        let last = u32::try_from(self.total_pages.max(1)).unwrap_or(u32::MAX);
        self.params.page = page.clamp(1, last);
        self.refresh_todos()
    }

    pub fn set_category_filter(&mut self, category_id: Option<i64>) -> Result<Outgoing, ApiError> {
        self.params.category_id = category_id;
        self.params.page = 1;
        self.refresh_todos()
    }

    pub fn set_priority_filter(&mut self, priority: Option<u8>) -> Result<Outgoing, ApiError> {
        self.params.priority = priority;
        self.params.page = 1;
        self.refresh_todos()
    }

    pub fn set_completed_filter(&mut self, completed: Option<bool>) -> Result<Outgoing, ApiError> {
        self.params.completed = completed;
        self.params.page = 1;
        self.refresh_todos()
    }

    /// Records a keystroke in the search box. Nothing is fetched until
    /// [`ViewState::poll`] sees the input settle.
    pub fn search_input(&mut self, text: impl Into<String>, now: Instant) {
        self.debouncer.input(text, now);
    }

    /// Issues the search fetch once the debounce delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Outgoing>, ApiError> {
        let Some(text) = self.debouncer.poll(now) else {
            return Ok(None);
        };
        let search = Some(text.trim().to_string()).filter(|s| !s.is_empty());
        if search == self.params.search {
            return Ok(None);
        }
        self.params.search = search;
        self.params.page = 1;
        self.refresh_todos().map(Some)
    }

    /// Empties the search box. Drops any keystrokes still waiting out the
    /// debounce and refetches only if a search was active.
    pub fn clear_search(&mut self) -> Result<Option<Outgoing>, ApiError> {
        self.debouncer.cancel();
        if self.params.search.take().is_none() {
            return Ok(None);
        }
        self.params.page = 1;
        self.refresh_todos().map(Some)
    }

    // --- mutations ---

    /// `None` when the text is blank; nothing is sent.
    pub fn create_todo(&mut self, input: CreateTodo) -> Result<Option<Outgoing>, ApiError> {
        if input.text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Outgoing {
            ticket: Ticket::CreateTodo,
            request: self.client.build_create_todo(&input)?,
        }))
    }

    pub fn update_todo(&mut self, id: i64, input: &UpdateTodo) -> Result<Outgoing, ApiError> {
        Ok(Outgoing {
            ticket: Ticket::UpdateTodo { id },
            request: self.client.build_update_todo(id, input)?,
        })
    }

    /// Flips completion of a listed todo. `None` if it is not in the list.
    pub fn toggle_todo(&mut self, id: i64) -> Result<Option<Outgoing>, ApiError> {
        let Some(completed) = self.todos.iter().find(|t| t.todo.id == id).map(|t| t.todo.completed) else {
            return Ok(None);
        };
        self.update_todo(id, &UpdateTodo::completed(!completed)).map(Some)
    }

    pub fn delete_todo(&mut self, id: i64) -> Outgoing {
        Outgoing {
            ticket: Ticket::DeleteTodo { id },
            request: self.client.build_delete_todo(id),
        }
    }

    pub fn create_category(&mut self, name: &str) -> Result<Option<Outgoing>, ApiError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Outgoing {
            ticket: Ticket::CreateCategory,
            request: self.client.build_create_category(name.trim())?,
        }))
    }

    pub fn delete_category(&mut self, id: i64) -> Outgoing {
        Outgoing {
            ticket: Ticket::DeleteCategory { id },
            request: self.client.build_delete_category(id),
        }
    }

    /// Opens the detail view for a listed todo and fetches its comments.
    pub fn select_todo(&mut self, id: i64) -> Option<Outgoing> {
        let item = self.todos.iter().find(|t| t.todo.id == id)?.clone();
        self.selected = Some(item);
        self.comments.clear();
        let seq = bump(&mut self.comments_seq);
        Some(Outgoing {
            ticket: Ticket::Comments { todo_id: id, seq },
            request: self.client.build_list_comments(id),
        })
    }

    /// Closes the detail view. Comment fetches still in flight become stale.
    pub fn close_todo(&mut self) {
        self.selected = None;
        self.comments.clear();
        bump(&mut self.comments_seq);
    }

    /// Comments on the selected todo. `None` when nothing is selected or the
    /// text is blank.
    pub fn add_comment(&mut self, text: &str) -> Result<Option<Outgoing>, ApiError> {
        let Some(todo_id) = self.selected.as_ref().map(|t| t.todo.id) else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Outgoing {
            ticket: Ticket::AddComment { todo_id },
            request: self.client.build_add_comment(todo_id, text)?,
        }))
    }

    /// Sends a previously exported JSON document for import.
    pub fn import_json(&mut self, document: &str) -> Result<Outgoing, ApiError> {
        Ok(Outgoing {
            ticket: Ticket::Import,
            request: self.client.build_import_json(document)?,
        })
    }

    pub fn toggle_dark_mode(&mut self, store: &mut dyn PreferenceStore) -> Result<(), PreferenceError> {
        let next = Preferences {
            dark_mode: !self.prefs.dark_mode,
        };
        store.save(&next)?;
        self.prefs = next;
        Ok(())
    }

    // --- responses ---

    /// Folds a response into the view state.
    ///
    /// On failure the affected state is reset (lists) or left alone
    /// (mutations), a notice is recorded where the user should see one, and
    /// the error is returned.
    pub fn apply(&mut self, ticket: Ticket, response: HttpResponse) -> Result<Applied, ApiError> {
        match ticket {
            Ticket::Todos { seq } => {
                if seq != self.todos_seq {
                    tracing::debug!(seq, latest = self.todos_seq, "dropping stale todo list");
                    return Ok(Applied::Stale);
                }
                self.loading = false;
                match self.client.parse_list_todos(response) {
                    Ok(page) => {
                        self.todos = page.todos;
                        self.total = page.total;
                        self.total_pages = page.pages.max(1);
                        self.sync_selected();
                        Ok(Applied::Updated)
                    }
                    Err(e) => {
                        self.todos.clear();
                        self.total = 0;
                        self.total_pages = 1;
                        self.notice = Some(FETCH_TODOS_FAILED.to_string());
                        Err(e)
                    }
                }
            }
            Ticket::Categories { seq } => {
                if seq != self.categories_seq {
                    return Ok(Applied::Stale);
                }
                match self.client.parse_list_categories(response) {
                    Ok(categories) => {
                        self.categories = categories;
                        Ok(Applied::Updated)
                    }
                    Err(e) => {
                        self.categories.clear();
                        Err(e)
                    }
                }
            }
            Ticket::Comments { todo_id, seq } => {
                if seq != self.comments_seq || self.selected_id() != Some(todo_id) {
                    tracing::debug!(todo_id, seq, "dropping stale comments");
                    return Ok(Applied::Stale);
                }
                match self.client.parse_list_comments(response) {
                    Ok(comments) => {
                        self.comments = comments;
                        Ok(Applied::Updated)
                    }
                    Err(e) => {
                        self.comments.clear();
                        Err(e)
                    }
                }
            }
            Ticket::CreateTodo => {
                let todo = self.client.parse_create_todo(response).map_err(|e| self.fail(ADD_TODO_FAILED, e))?;
                if !self.matches_params(&todo) {
                    return Ok(Applied::Updated);
                }
                if self.params.page != 1 {
                    return Ok(Applied::Refetch(self.refresh_todos()?));
                }
                self.insert_created(todo);
                Ok(Applied::Updated)
            }
            Ticket::UpdateTodo { .. } => {
                let todo = self
                    .client
                    .parse_update_todo(response)
                    .map_err(|e| self.fail(UPDATE_TODO_FAILED, e))?;
                let id = todo.id;
                let still_listed = self.matches_params(&todo);
                self.replace_updated(todo);
                if !still_listed && self.remove_listed(id) {
                    return self.after_removal();
                }
                Ok(Applied::Updated)
            }
            Ticket::DeleteTodo { id } => {
                self.client
                    .parse_delete_todo(response)
                    .map_err(|e| self.fail(DELETE_TODO_FAILED, e))?;
                if self.selected_id() == Some(id) {
                    self.close_todo();
                }
                if self.remove_listed(id) {
                    return self.after_removal();
                }
                Ok(Applied::Updated)
            }
            Ticket::CreateCategory => {
                let category = self.client.parse_create_category(response).map_err(|e| {
                    let message = e.to_string();
                    self.fail(&message, e)
                })?;
                self.categories.push(category);
                self.categories.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(Applied::Updated)
            }
            Ticket::DeleteCategory { id } => {
                self.client.parse_delete_category(response).map_err(|e| {
                    let message = e.to_string();
                    self.fail(&message, e)
                })?;
                self.categories.retain(|c| c.id != id);
                for item in self.todos.iter_mut().chain(self.selected.iter_mut()) {
                    if item.todo.category_id == Some(id) {
                        item.todo.category_id = None;
                        item.category_name = None;
                    }
                }
                if self.params.category_id == Some(id) {
                    self.params.category_id = None;
                    self.params.page = 1;
                    return Ok(Applied::Refetch(self.refresh_todos()?));
                }
                Ok(Applied::Updated)
            }
            Ticket::AddComment { todo_id } => {
                let comment = self
                    .client
                    .parse_add_comment(response)
                    .map_err(|e| self.fail(ADD_COMMENT_FAILED, e))?;
                if self.selected_id() == Some(todo_id) {
                    self.comments.insert(0, comment);
                }
                for item in self.todos.iter_mut().chain(self.selected.iter_mut()) {
                    if item.todo.id == todo_id {
                        item.comment_count += 1;
                    }
                }
                Ok(Applied::Updated)
            }
            Ticket::Import => {
                self.client
                    .parse_import_json(response)
                    .map_err(|e| self.fail(IMPORT_FAILED, e))?;
                Ok(Applied::Refetch(self.refresh_todos()?))
            }
        }
    }

    fn fail(&mut self, notice: &str, err: ApiError) -> ApiError {
        tracing::warn!(error = %err, "{notice}");
        self.notice = Some(notice.to_string());
        err
    }

    fn selected_id(&self) -> Option<i64> {
        self.selected.as_ref().map(|t| t.todo.id)
    }

    fn category_name(&self, category_id: Option<i64>) -> Option<String> {
        let id = category_id?;
        self.categories.iter().find(|c| c.id == id).map(|c| c.name.clone())
    }

    fn recount_pages(&mut self) {
        let size = i64::from(self.params.page_size.max(1));
        self.total_pages = ((self.total + size - 1) / size).max(1);
    }

    /// Whether `todo` passes the active list filters. Search is a
    /// case-insensitive substring match.
    fn matches_params(&self, todo: &Todo) -> bool {
        let p = &self.params;
        p.category_id.map_or(true, |c| todo.category_id == Some(c))
            && p.priority.map_or(true, |pr| todo.priority == pr)
            && p.completed.map_or(true, |c| todo.completed == c)
            && p.search
                .as_deref()
                .map_or(true, |q| todo.text.to_lowercase().contains(&q.to_lowercase()))
    }

    /// Drops a todo from the current page. `false` if it was not listed.
    fn remove_listed(&mut self, id: i64) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.todo.id != id);
        if self.todos.len() == before {
            return false;
        }
        self.total = (self.total - 1).max(0);
        self.recount_pages();
        true
    }

    /// After a row leaves the page: refetch when a later page can fill the
    /// gap, or step back when this page is now empty.
    fn after_removal(&mut self) -> Result<Applied, ApiError> {
        let offset = i64::from(self.params.page.saturating_sub(1)) * i64::from(self.params.page_size);
        let shown_through = offset + self.todos.len() as i64;
        if self.todos.is_empty() && self.params.page > 1 {
            self.params.page -= 1;
            return Ok(Applied::Refetch(self.refresh_todos()?));
        }
        if self.total > shown_through {
            return Ok(Applied::Refetch(self.refresh_todos()?));
        }
        Ok(Applied::Updated)
    }

    /// Places a newly created todo where the server's ordering would put it
    /// on the first page. Callers check the filters and page first.
    fn insert_created(&mut self, todo: Todo) {
        let item = TodoItem {
            category_name: self.category_name(todo.category_id),
            comment_count: 0,
            todo,
        };
        let key = sort_key(&item);
        let at = self
            .todos
            .iter()
            .position(|t| sort_key(t) > key)
            .unwrap_or(self.todos.len());
        self.todos.insert(at, item);
        self.todos.truncate(self.params.page_size as usize);
        self.total += 1;
        self.recount_pages();
    }

    /// Swaps in the server's version of a todo, keeping its comment count.
    fn replace_updated(&mut self, todo: Todo) {
        let category_name = self.category_name(todo.category_id);
        for item in self.todos.iter_mut().chain(self.selected.iter_mut()) {
            if item.todo.id == todo.id {
                item.todo = todo.clone();
                item.category_name = category_name.clone();
            }
        }
    }

    /// Keeps the detail view in step with a freshly fetched list entry.
    fn sync_selected(&mut self) {
        if let Some(selected) = self.selected.as_mut() {
            if let Some(fresh) = self.todos.iter().find(|t| t.todo.id == selected.todo.id) {
                *selected = fresh.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferenceStore;
    use std::time::Duration;

    fn state() -> ViewState {
        ViewState::new(TodoClient::new("http://localhost:5001"), Preferences::default())
    }

    fn ok(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn todo_json(id: i64, text: &str, priority: u8, minute: u32) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "text": text,
            "completed": false,
            "category_id": null,
            "priority": priority,
            "created_at": format!("2025-01-01T10:{minute:02}:00Z"),
            "due_date": null,
            "category_name": null,
            "comment_count": 0
        })
    }

    fn page(todos: Vec<serde_json::Value>, total: i64, pages: i64) -> HttpResponse {
        ok(200, serde_json::json!({ "todos": todos, "total": total, "pages": pages }))
    }

    fn loaded() -> ViewState {
        let mut s = state();
        let out = s.refresh_todos().unwrap();
        s.apply(
            out.ticket,
            page(vec![todo_json(2, "newer", 1, 5), todo_json(1, "older", 1, 0)], 2, 1),
        )
        .unwrap();
        s
    }

    #[test]
    fn load_issues_todos_and_categories() {
        let mut s = state();
        let out = s.load().unwrap();
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0].ticket, Ticket::Todos { .. }));
        assert!(matches!(out[1].ticket, Ticket::Categories { .. }));
        assert!(s.is_loading());
    }

    #[test]
    fn stale_todo_list_is_dropped() {
        let mut s = state();
        let first = s.refresh_todos().unwrap();
        let second = s.set_category_filter(Some(3)).unwrap();

        let applied = s.apply(second.ticket, page(vec![todo_json(9, "filtered", 1, 0)], 1, 1)).unwrap();
        assert_eq!(applied, Applied::Updated);
        let applied = s.apply(first.ticket, page(vec![todo_json(1, "old", 1, 0)], 1, 1)).unwrap();
        assert_eq!(applied, Applied::Stale);
        assert_eq!(s.todos()[0].todo.id, 9);
    }

    #[test]
    fn failed_list_fetch_resets_and_notifies() {
        let mut s = loaded();
        let out = s.refresh_todos().unwrap();
        let err = s.apply(out.ticket, ok(500, serde_json::json!({"error": "boom"}))).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
        assert!(s.todos().is_empty());
        assert_eq!(s.total_pages(), 1);
        assert_eq!(s.take_notice().as_deref(), Some(FETCH_TODOS_FAILED));
        assert!(s.notice().is_none());
    }

    #[test]
    fn filter_change_resets_page() {
        let mut s = state();
        s.total_pages = 5;
        s.set_page(4).unwrap();
        assert_eq!(s.params().page, 4);
        let out = s.set_priority_filter(Some(3)).unwrap();
        assert_eq!(s.params().page, 1);
        assert!(out.request.path.contains("priority=3"));
    }

    #[test]
    fn set_page_is_clamped() {
        let mut s = state();
        s.total_pages = 3;
        s.set_page(10).unwrap();
        assert_eq!(s.params().page, 3);
        s.set_page(0).unwrap();
        assert_eq!(s.params().page, 1);
    }

    #[test]
    fn debounced_search_fetches_once() {
        let start = Instant::now();
        let mut s = state();
        s.search_input("m", start);
        s.search_input("mil", start + Duration::from_millis(100));
        s.search_input("milk", start + Duration::from_millis(200));
        assert!(s.poll(start + Duration::from_millis(250)).unwrap().is_none());

        let out = s.poll(start + Duration::from_millis(600)).unwrap().unwrap();
        assert!(out.request.path.contains("search=milk"));
        assert_eq!(s.params().search.as_deref(), Some("milk"));
        assert!(s.poll(start + Duration::from_secs(2)).unwrap().is_none());
    }

    #[test]
    fn clear_search_drops_pending_input() {
        let start = Instant::now();
        let mut s = state();
        s.search_input("milk", start);
        s.poll(start + Duration::from_secs(1)).unwrap().unwrap();

        s.search_input("milk and", start + Duration::from_secs(2));
        let out = s.clear_search().unwrap().unwrap();
        assert!(!out.request.path.contains("search="));
        assert_eq!(s.search_deadline(), None);
        assert!(s.poll(start + Duration::from_secs(5)).unwrap().is_none());
        assert!(s.clear_search().unwrap().is_none());
    }

    #[test]
    fn unchanged_search_does_not_refetch() {
        let start = Instant::now();
        let mut s = state();
        s.search_input("  ", start);
        assert!(s.poll(start + Duration::from_secs(1)).unwrap().is_none());
    }

    #[test]
    fn created_todo_uses_server_record() {
        let mut s = loaded();
        s.categories = vec![Category {
            id: 4,
            name: "Work".into(),
        }];
        let out = s
            .create_todo(CreateTodo {
                category_id: Some(4),
                priority: Some(3),
                ..CreateTodo::new("urgent")
            })
            .unwrap()
            .unwrap();
        let mut record = todo_json(3, "urgent", 3, 9);
        record["category_id"] = 4.into();
        s.apply(out.ticket, ok(201, record)).unwrap();

        let first = &s.todos()[0];
        assert_eq!(first.todo.id, 3);
        assert_eq!(first.category_name.as_deref(), Some("Work"));
        assert_eq!(first.comment_count, 0);
        assert_eq!(s.total(), 3);
    }

    fn done(mut record: serde_json::Value) -> serde_json::Value {
        record["completed"] = true.into();
        record
    }

    #[test]
    fn created_todo_outside_filter_is_not_listed() {
        let mut s = state();
        let out = s.set_completed_filter(Some(true)).unwrap();
        s.apply(out.ticket, page(vec![done(todo_json(1, "finished", 1, 0))], 1, 1))
            .unwrap();

        let out = s.create_todo(CreateTodo::new("open")).unwrap().unwrap();
        let applied = s.apply(out.ticket, ok(201, todo_json(2, "open", 3, 5))).unwrap();
        assert_eq!(applied, Applied::Updated);
        let ids: Vec<i64> = s.todos().iter().map(|t| t.todo.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(s.total(), 1);
    }

    #[test]
    fn created_todo_not_matching_search_is_not_listed() {
        let mut s = loaded();
        s.params.search = Some("MILK".into());
        let out = s.create_todo(CreateTodo::new("buy Milk")).unwrap().unwrap();
        s.apply(out.ticket, ok(201, todo_json(3, "buy Milk", 1, 9))).unwrap();
        assert_eq!(s.todos()[0].todo.id, 3);

        let out = s.create_todo(CreateTodo::new("walk dog")).unwrap().unwrap();
        s.apply(out.ticket, ok(201, todo_json(4, "walk dog", 1, 10))).unwrap();
        assert!(s.todos().iter().all(|t| t.todo.id != 4));
    }

    #[test]
    fn create_on_later_page_refetches() {
        let mut s = state();
        s.total_pages = 3;
        let out = s.set_page(2).unwrap();
        s.apply(out.ticket, page(vec![todo_json(5, "middle", 1, 0)], 21, 3)).unwrap();

        let out = s.create_todo(CreateTodo::new("urgent")).unwrap().unwrap();
        let applied = s.apply(out.ticket, ok(201, todo_json(30, "urgent", 3, 9))).unwrap();
        assert!(matches!(applied, Applied::Refetch(Outgoing { ticket: Ticket::Todos { .. }, .. })));
        assert_eq!(s.todos().len(), 1);
        assert_eq!(s.params().page, 2);
    }

    #[test]
    fn toggle_under_open_filter_drops_todo() {
        let mut s = state();
        let out = s.set_completed_filter(Some(false)).unwrap();
        s.apply(
            out.ticket,
            page(vec![todo_json(2, "newer", 1, 5), todo_json(1, "older", 1, 0)], 2, 1),
        )
        .unwrap();

        let out = s.toggle_todo(1).unwrap().unwrap();
        let applied = s.apply(out.ticket, ok(200, done(todo_json(1, "older", 1, 0)))).unwrap();
        assert_eq!(applied, Applied::Updated);
        let ids: Vec<i64> = s.todos().iter().map(|t| t.todo.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(s.total(), 1);
    }

    #[test]
    fn delete_on_full_page_refetches_to_backfill() {
        let mut s = state();
        s.params.page_size = 2;
        let out = s.refresh_todos().unwrap();
        s.apply(
            out.ticket,
            page(vec![todo_json(2, "newer", 1, 5), todo_json(1, "older", 1, 0)], 5, 3),
        )
        .unwrap();

        let out = s.delete_todo(2);
        let applied = s
            .apply(out.ticket, ok(200, serde_json::json!({"message": "Todo deleted successfully"})))
            .unwrap();
        assert!(matches!(applied, Applied::Refetch(_)));
        assert_eq!(s.total(), 4);
    }

    #[test]
    fn deleting_last_row_of_page_steps_back() {
        let mut s = state();
        s.params.page_size = 2;
        s.total_pages = 2;
        let out = s.set_page(2).unwrap();
        s.apply(out.ticket, page(vec![todo_json(1, "lonely", 1, 0)], 3, 2)).unwrap();

        let out = s.delete_todo(1);
        let applied = s
            .apply(out.ticket, ok(200, serde_json::json!({"message": "Todo deleted successfully"})))
            .unwrap();
        let Applied::Refetch(next) = applied else {
            panic!("expected a refetch");
        };
        assert_eq!(s.params().page, 1);
        assert!(next.request.path.contains("page=1&"));
    }

    #[test]
    fn blank_todo_is_not_sent() {
        let mut s = state();
        assert!(s.create_todo(CreateTodo::new("   ")).unwrap().is_none());
    }

    #[test]
    fn failed_create_leaves_list_and_notifies() {
        let mut s = loaded();
        let out = s.create_todo(CreateTodo::new("x")).unwrap().unwrap();
        let err = s
            .apply(out.ticket, ok(400, serde_json::json!({"error": "priority must be 1, 2 or 3"})))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(s.todos().len(), 2);
        assert_eq!(s.notice(), Some(ADD_TODO_FAILED));
    }

    #[test]
    fn toggle_replaces_with_server_version() {
        let mut s = loaded();
        let out = s.toggle_todo(1).unwrap().unwrap();
        assert_eq!(out.request.body.as_deref(), Some(r#"{"completed":true}"#));

        let mut record = todo_json(1, "older", 1, 0);
        record["completed"] = true.into();
        s.apply(out.ticket, ok(200, record)).unwrap();
        assert!(s.todos().iter().find(|t| t.todo.id == 1).unwrap().todo.completed);
        assert!(s.toggle_todo(42).unwrap().is_none());
    }

    #[test]
    fn delete_removes_and_closes_detail() {
        let mut s = loaded();
        s.select_todo(2).unwrap();
        let out = s.delete_todo(2);
        s.apply(out.ticket, ok(200, serde_json::json!({"message": "Todo deleted successfully"})))
            .unwrap();
        assert_eq!(s.todos().len(), 1);
        assert!(s.selected().is_none());
        assert_eq!(s.total(), 1);
    }

    #[test]
    fn comments_for_closed_todo_are_stale() {
        let mut s = loaded();
        let out = s.select_todo(1).unwrap();
        s.close_todo();
        let comments = serde_json::json!([{"id": 1, "todo_id": 1, "text": "hi", "created_at": "2025-01-01T10:00:00Z"}]);
        assert_eq!(s.apply(out.ticket, ok(200, comments)).unwrap(), Applied::Stale);
        assert!(s.comments().is_empty());
    }

    #[test]
    fn switching_selection_drops_earlier_comments() {
        let mut s = loaded();
        let first = s.select_todo(1).unwrap();
        let second = s.select_todo(2).unwrap();
        let for_two = serde_json::json!([{"id": 5, "todo_id": 2, "text": "two", "created_at": "2025-01-01T10:00:00Z"}]);
        let for_one = serde_json::json!([{"id": 4, "todo_id": 1, "text": "one", "created_at": "2025-01-01T10:00:00Z"}]);
        s.apply(second.ticket, ok(200, for_two)).unwrap();
        assert_eq!(s.apply(first.ticket, ok(200, for_one)).unwrap(), Applied::Stale);
        assert_eq!(s.comments()[0].text, "two");
    }

    #[test]
    fn added_comment_is_prepended_and_counted() {
        let mut s = loaded();
        let out = s.select_todo(1).unwrap();
        let existing = serde_json::json!([{"id": 1, "todo_id": 1, "text": "old", "created_at": "2025-01-01T10:00:00Z"}]);
        s.apply(out.ticket, ok(200, existing)).unwrap();

        let out = s.add_comment("new").unwrap().unwrap();
        let created = serde_json::json!({"id": 2, "todo_id": 1, "text": "new", "created_at": "2025-01-01T11:00:00Z"});
        s.apply(out.ticket, ok(201, created)).unwrap();

        let texts: Vec<&str> = s.comments().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "old"]);
        assert_eq!(s.selected().unwrap().comment_count, 1);
        assert_eq!(s.todos().iter().find(|t| t.todo.id == 1).unwrap().comment_count, 1);
    }

    #[test]
    fn comment_needs_selection() {
        let mut s = loaded();
        assert!(s.add_comment("hello").unwrap().is_none());
    }

    #[test]
    fn deleting_filtered_category_refetches() {
        let mut s = loaded();
        s.categories = vec![Category {
            id: 7,
            name: "Old".into(),
        }];
        s.set_category_filter(Some(7)).unwrap();
        let out = s.delete_category(7);
        let applied = s
            .apply(out.ticket, ok(200, serde_json::json!({"message": "Category deleted successfully"})))
            .unwrap();
        assert!(matches!(applied, Applied::Refetch(Outgoing { ticket: Ticket::Todos { .. }, .. })));
        assert!(s.categories().is_empty());
        assert_eq!(s.params().category_id, None);
    }

    #[test]
    fn duplicate_category_surfaces_server_message() {
        let mut s = state();
        let out = s.create_category("Work").unwrap().unwrap();
        s.apply(out.ticket, ok(400, serde_json::json!({"error": "category \"Work\" already exists"})))
            .unwrap_err();
        assert_eq!(s.notice(), Some("rejected: category \"Work\" already exists"));
    }

    #[test]
    fn import_success_triggers_refresh() {
        let mut s = state();
        let out = s.import_json(r#"[{"text":"a"}]"#).unwrap();
        let applied = s
            .apply(out.ticket, ok(200, serde_json::json!({"message": "Todos imported successfully", "imported": 1})))
            .unwrap();
        assert!(matches!(applied, Applied::Refetch(_)));
    }

    #[test]
    fn dark_mode_persists() {
        let mut store = MemoryPreferenceStore::default();
        let mut s = state();
        assert_eq!(s.body_class(), "");
        s.toggle_dark_mode(&mut store).unwrap();
        assert!(s.dark_mode());
        assert_eq!(s.body_class(), "dark-mode");

        let restored = ViewState::new(TodoClient::new("http://x"), store.load().unwrap());
        assert!(restored.dark_mode());
    }
}
