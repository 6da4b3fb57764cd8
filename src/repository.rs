use crate::models::{Movie, NewMovie, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

/// StoreError
///
/// Failures surfaced by a [`Repository`]. Anything other than a duplicate
/// key is treated as an internal failure by the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. email already registered).
    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// The persistence contract for accounts and movies. Handlers and the movie
/// service only ever see this trait, threaded through `AppState`; the
/// concrete store is chosen once in `main`.
///
/// Each call is a single attempt. Conflicting writes to the same row are
/// serialised by the store itself.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    // Fails with `StoreError::Duplicate` when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    // --- Movies ---
    // Newest first (created_at DESC, then id DESC).
    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;
    async fn get_movie(&self, id: i64) -> StoreResult<Option<Movie>>;
    async fn create_movie(&self, movie: &NewMovie) -> StoreResult<Movie>;
    // Full replacement. `None` when no row has this id.
    async fn update_movie(&self, id: i64, movie: &NewMovie) -> StoreResult<Option<Movie>>;
    // Permanent. Returns whether a row was removed.
    async fn delete_movie(&self, id: i64) -> StoreResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, name, email, password, role, created_at, updated_at";
const MOVIE_COLUMNS: &str = "id, title, rating, release_date, created_at, updated_at";

/// PostgresRepository
///
/// The production [`Repository`], backed by PostgreSQL through a `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Relies on the `uq_users_email` constraint to reject duplicates, so two
    /// concurrent registrations for one email cannot both succeed.
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (name, email, password, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::Duplicate(format!("email {} is already registered", user.email))
                }
                _ => StoreError::Database(e),
            })
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let query = format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at DESC, id DESC");
        let movies = sqlx::query_as::<_, Movie>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        let query = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        let movie = sqlx::query_as::<_, Movie>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(movie)
    }

    async fn create_movie(&self, movie: &NewMovie) -> StoreResult<Movie> {
        let query = format!(
            "INSERT INTO movies (title, rating, release_date, created_at, updated_at) \
             VALUES ($1, $2, $3, NOW(), NOW()) RETURNING {MOVIE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Movie>(&query)
            .bind(&movie.title)
            .bind(movie.rating)
            .bind(movie.release_date)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_movie(&self, id: i64, movie: &NewMovie) -> StoreResult<Option<Movie>> {
        let query = format!(
            "UPDATE movies SET title = $2, rating = $3, release_date = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {MOVIE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Movie>(&query)
            .bind(id)
            .bind(&movie.title)
            .bind(movie.rating)
            .bind(movie.release_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// InMemoryRepository
///
/// A process-local [`Repository`] used for local runs without a database and
/// by the test suites. Ids are assigned sequentially from 1, like a
/// `BIGSERIAL` column.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<MemoryTables>,
}

#[derive(Default)]
struct MemoryTables {
    users: BTreeMap<i64, User>,
    movies: BTreeMap<i64, Movie>,
    last_user_id: i64,
    last_movie_id: i64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!(
                "email {} is already registered",
                user.email
            )));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.last_user_id,
            name: user.name,
            email: user.email,
            password: user.password,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let tables = self.inner.read().await;
        let mut movies: Vec<Movie> = tables.movies.values().cloned().collect();
        movies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> StoreResult<Option<Movie>> {
        Ok(self.inner.read().await.movies.get(&id).cloned())
    }

    async fn create_movie(&self, movie: &NewMovie) -> StoreResult<Movie> {
        let mut tables = self.inner.write().await;
        tables.last_movie_id += 1;
        let now = Utc::now();
        let created = Movie {
            id: tables.last_movie_id,
            title: movie.title.clone(),
            rating: movie.rating,
            release_date: movie.release_date,
            created_at: now,
            updated_at: now,
        };
        tables.movies.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_movie(&self, id: i64, movie: &NewMovie) -> StoreResult<Option<Movie>> {
        let mut tables = self.inner.write().await;
        let Some(existing) = tables.movies.get_mut(&id) else {
            return Ok(None);
        };

        existing.title = movie.title.clone();
        existing.rating = movie.rating;
        existing.release_date = movie.release_date;
        existing.updated_at = Utc::now().max(existing.created_at);
        Ok(Some(existing.clone()))
    }

    async fn delete_movie(&self, id: i64) -> StoreResult<bool> {
        Ok(self.inner.write().await.movies.remove(&id).is_some())
    }
}
