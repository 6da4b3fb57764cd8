use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Browser pages. Both are static; all data moves through the JSON API.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Sign-in and registration. The edge gate redirects here.
        .route("/", get(handlers::index_page))
        // GET /movie
        // Catalog table with create/edit/delete.
        .route("/movie", get(handlers::movie_page))
}
