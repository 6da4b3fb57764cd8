use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Movie Router Module
///
/// CRUD over the movie resource. Every handler takes `AuthUser`, so the
/// token is verified in full before any policy check or store access; the
/// edge gate in front only filters out absent or misshapen cookies.
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/movies
        // List (newest first) or create. Create requires the `create` permission.
        .route(
            "/api/movies",
            get(handlers::list_movies).post(handlers::create_movie),
        )
        // GET/PUT/DELETE /api/movies/{id}
        // Read, full replace, or permanent delete (MANAGER only).
        .route(
            "/api/movies/{id}",
            get(handlers::get_movie)
                .put(handlers::update_movie)
                .delete(handlers::delete_movie),
        )
}
