use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token, plus `GET /api/auth/me`, which has
/// no edge gate in front of it and rejects through the `AuthUser` extractor.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates an account with a hashed password and one of the three roles.
        .route("/api/auth/register", post(handlers::register_user))
        // POST /api/auth/login
        // Verifies credentials and sets the `auth-token` cookie.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/logout
        // Clears the `auth-token` cookie.
        .route("/api/auth/logout", post(handlers::logout))
        // GET /api/auth/me
        // The caller's account, re-read from the store.
        .route("/api/auth/me", get(handlers::get_me))
}
