//! Client core for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and keeps the client's view
//! state: the current page of todos, categories, the selected todo's
//! comments, filters, and preferences.
//!
//! # Design
//! - `TodoClient` is stateless: it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `ViewState` turns user intents into tagged requests and folds responses
//!   back in, discarding responses that a newer fetch has superseded.
//! - DTOs are defined independently from the server crate; the end-to-end
//!   test catches schema drift.

pub mod client;
pub mod debounce;
pub mod error;
pub mod http;
pub mod prefs;
pub mod state;
pub mod types;

pub use client::TodoClient;
pub use debounce::SearchDebouncer;
pub use error::{ApiError, PreferenceError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences};
pub use state::{Applied, Outgoing, Ticket, ViewState};
pub use types::{Category, Comment, CreateTodo, ListParams, Message, Todo, TodoItem, TodoPage, UpdateTodo};
