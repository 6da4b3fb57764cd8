use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult, ValidationError},
    models::{
        AuthResponse, LoginRequest, MeResponse, MessageResponse, Movie, MoviePayload, NewUser,
        RegisterRequest, UserProfile,
    },
    password,
    policy::Role,
    token::TokenSubject,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;

// --- Helpers ---

/// Turns a body that could not be read as `T` into a field-level error on
/// `body`, so it renders like any other validation failure.
fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ValidationError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationError::single("body", rejection.body_text()))
}

/// Returns the value when it is present and not blank, otherwise records `field` as missing.
fn required(value: Option<String>, field: &str, errors: &mut ValidationError) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.push(field, "is required");
            None
        }
    }
}

async fn run_blocking<T, F>(what: &'static str, f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("{what} task failed: {e}")))
}

// --- Account Handlers ---

/// register_user
///
/// [Public Route] Creates a staff account. The password is stored only as an
/// Argon2id hash and the response never includes it.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing fields, invalid role or duplicate email")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let payload = read_body(payload)?;

    let mut errors = ValidationError::default();
    let name = required(payload.name, "name", &mut errors);
    let email = required(payload.email, "email", &mut errors);
    let plain = required(payload.password, "password", &mut errors);
    let role = required(payload.role, "role", &mut errors);
    let (Some(name), Some(email), Some(plain), Some(role)) = (name, email, plain, role) else {
        return Err(errors.into());
    };

    let role: Role = role.parse().map_err(|_| {
        ValidationError::single("role", "must be one of: MANAGER, TEAMLEADER, FLOORSTAFF")
    })?;

    if state.repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let hash = run_blocking("password hashing", move || password::hash_password(&plain))
        .await?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;

    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            password: hash,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

/// login
///
/// [Public Route] Checks the credentials and sets the `auth-token` cookie
/// with a token valid for one hour. Unknown email and wrong password are
/// indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; auth-token cookie set", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let payload = read_body(payload)?;

    let mut errors = ValidationError::default();
    let email = required(payload.email, "email", &mut errors);
    let plain = required(payload.password, "password", &mut errors);
    let (Some(email), Some(plain)) = (email, plain) else {
        return Err(errors.into());
    };

    let bad_credentials = || AppError::Unauthenticated("Invalid email or password".to_string());

    let Some(user) = state.repo.get_user_by_email(&email).await? else {
        tracing::warn!("Login failed: unknown email");
        return Err(bad_credentials());
    };

    let stored = user.password.clone();
    let matches = run_blocking("password verification", move || {
        password::verify_password(&plain, &stored)
    })
    .await?
    .map_err(|e| AppError::Internal(format!("stored credential unreadable: {e}")))?;

    if !matches {
        tracing::warn!(user_id = user.id, "Login failed: wrong password");
        return Err(bad_credentials());
    }

    let token = state
        .tokens
        .issue(&TokenSubject::from(&user))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, role = %user.role, "User signed in");

    let jar = jar.add(auth::session_cookie(token, state.config.cookie_secure));
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user: user.into(),
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the `auth-token` cookie. Tokens are stateless, so a
/// copy kept elsewhere stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Cookie cleared", body = MessageResponse))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(auth::expired_session_cookie()),
        Json(MessageResponse::new("Logged out")),
    )
}

/// get_me
///
/// [Authenticated Route] Returns the caller's account, re-read from the
/// store so renamed or removed accounts are reflected immediately.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "No or invalid token"),
        (status = 404, description = "Account no longer exists")
    )
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<MeResponse>> {
    let account = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        user: UserProfile::from(account),
        is_authenticated: true,
    }))
}

// --- Movie Handlers ---

/// list_movies
///
/// [Authenticated Route] All movies, newest first. No pagination.
#[utoipa::path(
    get,
    path = "/api/movies",
    responses(
        (status = 200, description = "All movies", body = [Movie]),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn list_movies(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list(&user).await?))
}

/// get_movie
#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Found", body = Movie),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_movie(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.get(&user, &id).await?))
}

/// create_movie
///
/// [Authenticated Route] Requires the `create` permission. `title`, `rating`
/// and `releaseDate` are all mandatory.
#[utoipa::path(
    post,
    path = "/api/movies",
    request_body = MoviePayload,
    responses(
        (status = 201, description = "Created", body = Movie),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Role lacks create")
    )
)]
pub async fn create_movie(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = state.movies.create(&user, read_body(payload)).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// update_movie
///
/// [Authenticated Route] Full replacement; the body has the same rules as create.
#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    request_body = MoviePayload,
    responses(
        (status = 200, description = "Updated", body = Movie),
        (status = 400, description = "Invalid id or validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Role lacks update"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_movie(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MoviePayload>, JsonRejection>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.update(&user, &id, read_body(payload)).await?))
}

/// delete_movie
///
/// [Authenticated Route] Permanent removal. MANAGER only.
#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Not a MANAGER"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_movie(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.movies.delete(&user, &id).await?;
    Ok(Json(MessageResponse::new("Movie deleted successfully")))
}

// --- Browser Pages ---

/// Sign-in and registration page.
pub async fn index_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Catalog page. Only reachable past the edge gate.
pub async fn movie_page() -> Html<&'static str> {
    Html(include_str!("../static/movie.html"))
}
