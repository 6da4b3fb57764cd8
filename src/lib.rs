use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core components: token codec, auth gate, access policy, movie service.
pub mod auth;
pub mod policy;
pub mod service;
pub mod token;

// Supporting layers.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;

// Routing segregation (public, movie API, pages).
pub mod routes;
use routes::{movies, pages, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use service::MovieService;
pub use token::TokenCodec;

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`
/// and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout, handlers::get_me,
        handlers::list_movies, handlers::get_movie, handlers::create_movie,
        handlers::update_movie, handlers::delete_movie
    ),
    components(
        schemas(
            models::Movie, models::MoviePayload, models::Rating, models::UserProfile,
            models::LoginRequest, models::RegisterRequest, models::AuthResponse,
            models::MeResponse, models::MessageResponse, policy::Role, error::FieldError,
        )
    ),
    tags(
        (name = "movie-catalog", description = "Movie catalog API with role-based access")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request. The store handle
/// and the token codec are constructed once and passed in explicitly; nothing
/// below this reaches for process-wide globals.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer.
    pub repo: RepositoryState,
    /// Movie lifecycle, backed by the same store handle.
    pub movies: MovieService,
    /// Token signing/verification with the configured secret.
    pub tokens: TokenCodec,
    /// The loaded configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            movies: MovieService::new(repo.clone()),
            tokens: TokenCodec::new(&config.jwt_secret),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> TokenCodec {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing table, the edge gate and the observability layers,
/// and binds the application state.
pub fn create_router(state: AppState) -> Router {
    // Same-origin browser UI; the API is not meant for cross-site callers.
    let cors = CorsLayer::new();

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(movies::movie_routes())
        .merge(pages::page_routes())
        // Edge gate: screens /movie and /api/movies (including unmatched
        // paths below them) before routing. Handlers still verify in full.
        .layer(middleware::from_fn(auth::edge_gate))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, uri and the `x-request-id`
/// assigned by `SetRequestIdLayer`, so every log line of one request
/// correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
