//! REST service for a single-user todo list backed by SQLite.
//!
//! # Design
//! The router receives its store as state (`Arc<dyn TodoStore>`), so the same
//! routes run against the on-disk database in production and an in-memory
//! database or a test double in tests. Handlers live in [`handlers`]; the
//! SQL lives in [`sqlite`].

pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod sqlite;
pub mod store;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use error::{ApiError, StoreError};
pub use models::{Category, Comment, Priority, Todo, TodoPage, TodoSummary};
pub use sqlite::SqliteStore;
pub use store::{SharedStore, TodoStore};

pub fn app(store: SharedStore) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route(
            "/todos/{id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route("/categories", get(handlers::list_categories).post(handlers::create_category))
        .route("/categories/{id}", delete(handlers::delete_category))
        .route("/export/csv", get(handlers::export_csv))
        .route("/export/json", get(handlers::export_json))
        .route("/import/json", post(handlers::import_json));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

pub async fn run(listener: TcpListener, store: SharedStore) -> Result<(), std::io::Error> {
    axum::serve(listener, app(store)).await
}
