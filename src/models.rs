use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::policy::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A staff account as stored in the `users` table. Carries the password
/// credential, so it is not `Serialize`; responses use
/// [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    // Unique across all accounts.
    pub email: String,
    // Argon2id PHC string.
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert shape for registration. The credential has already been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// UserProfile
///
/// The public view of a [`User`] returned by login, registration and `me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Rating
///
/// Classification of a movie. Backed by the `movie_rating` Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "movie_rating", rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Rating {
    G,
    Pg,
    M,
    Ma,
    R,
}

impl Rating {
    pub const ALL: [Rating; 5] = [Rating::G, Rating::Pg, Rating::M, Rating::Ma, Rating::R];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::G => "G",
            Rating::Pg => "PG",
            Rating::M => "M",
            Rating::Ma => "MA",
            Rating::R => "R",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.as_str() == s)
            .ok_or(())
    }
}

/// Movie
///
/// A catalog entry from the `movies` table. `id`, `created_at` and
/// `updated_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub rating: Rating,
    #[ts(type = "string")]
    pub release_date: NaiveDate,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewMovie
///
/// A validated movie payload, ready for insert or full replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub title: String,
    pub rating: Rating,
    pub release_date: NaiveDate,
}

// --- Request Payloads (Input Schemas) ---

/// MoviePayload
///
/// Raw body of `POST /api/movies` and `PUT /api/movies/{id}`. Every field is
/// optional at the wire level so that validation can name each missing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MoviePayload {
    #[schema(example = "Heat")]
    pub title: Option<String>,
    #[schema(example = "MA")]
    pub rating: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    #[schema(example = "1995-12-15")]
    pub release_date: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// RegisterRequest
///
/// Input payload for `POST /api/auth/register`. `role` is checked against the
/// three known tiers by the handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(example = "FLOORSTAFF")]
    pub role: Option<String>,
}

// --- Response Schemas ---

/// AuthResponse
///
/// Returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserProfile,
}

/// MeResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MeResponse {
    pub user: UserProfile,
    pub is_authenticated: bool,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
