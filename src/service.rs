use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, ValidationError},
    models::{Movie, MoviePayload, NewMovie, Rating},
    policy::Operation,
    repository::RepositoryState,
};

/// MovieService
///
/// Lifecycle of the movie resource. Every call runs in the same fixed order
/// and stops at the first failure:
///
/// 1. the caller arrives already authenticated (`AuthUser`),
/// 2. the role matrix is checked for the operation,
/// 3. the id and payload are validated,
/// 4. the target row must exist (get/update/delete),
/// 5. the store is mutated.
#[derive(Clone)]
pub struct MovieService {
    repo: RepositoryState,
}

impl MovieService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn list(&self, user: &AuthUser) -> AppResult<Vec<Movie>> {
        user.authorize(Operation::Read)?;
        Ok(self.repo.list_movies().await?)
    }

    pub async fn get(&self, user: &AuthUser, raw_id: &str) -> AppResult<Movie> {
        user.authorize(Operation::Read)?;
        let id = parse_movie_id(raw_id)?;

        self.repo
            .get_movie(id)
            .await?
            .ok_or_else(|| movie_not_found(id))
    }

    /// `payload` is `Err` when the request body could not be read as a
    /// movie payload at all; that is reported only after the policy check.
    pub async fn create(
        &self,
        user: &AuthUser,
        payload: Result<MoviePayload, ValidationError>,
    ) -> AppResult<Movie> {
        user.authorize(Operation::Create)?;
        let movie = payload?.validate()?;

        let created = self.repo.create_movie(&movie).await?;
        tracing::info!(movie_id = created.id, user_id = user.id, "Movie created");
        Ok(created)
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        raw_id: &str,
        payload: Result<MoviePayload, ValidationError>,
    ) -> AppResult<Movie> {
        user.authorize(Operation::Update)?;
        let id = parse_movie_id(raw_id)?;
        let movie = payload?.validate()?;

        if self.repo.get_movie(id).await?.is_none() {
            return Err(movie_not_found(id));
        }

        // The row can still vanish between the check and the write.
        let updated = self
            .repo
            .update_movie(id, &movie)
            .await?
            .ok_or_else(|| movie_not_found(id))?;
        tracing::info!(movie_id = id, user_id = user.id, "Movie updated");
        Ok(updated)
    }

    pub async fn delete(&self, user: &AuthUser, raw_id: &str) -> AppResult<()> {
        user.authorize(Operation::Delete)?;
        let id = parse_movie_id(raw_id)?;

        if self.repo.get_movie(id).await?.is_none() {
            return Err(movie_not_found(id));
        }
        if !self.repo.delete_movie(id).await? {
            return Err(movie_not_found(id));
        }

        tracing::info!(movie_id = id, user_id = user.id, "Movie deleted");
        Ok(())
    }
}

fn movie_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Movie {id} not found"))
}

/// parse_movie_id
///
/// Accepts only a plain positive decimal integer.
pub fn parse_movie_id(raw: &str) -> Result<i64, ValidationError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 && !raw.starts_with('+') => Ok(id),
        _ => Err(ValidationError::single(
            "id",
            "must be a positive integer",
        )),
    }
}

/// parse_release_date
///
/// Accepts a calendar date (`2024-01-01`) or an RFC 3339 timestamp
/// (`2024-01-01T00:00:00.000Z`), keeping the UTC date of the latter.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).date_naive())
    })
}

impl MoviePayload {
    /// validate
    ///
    /// Checks all three mandatory fields and reports every violation, in
    /// `title`, `rating`, `releaseDate` order. Create and update share this,
    /// so an update is always a full replacement.
    pub fn validate(self) -> Result<NewMovie, ValidationError> {
        let mut errors = ValidationError::default();

        let title = match self.title {
            Some(title) if !title.trim().is_empty() => Some(title),
            Some(_) => {
                errors.push("title", "must not be empty");
                None
            }
            None => {
                errors.push("title", "is required");
                None
            }
        };

        let rating = match self.rating.as_deref() {
            None | Some("") => {
                errors.push("rating", "is required");
                None
            }
            Some(raw) => match raw.parse::<Rating>() {
                Ok(rating) => Some(rating),
                Err(()) => {
                    errors.push("rating", "must be one of: G, PG, M, MA, R");
                    None
                }
            },
        };

        let release_date = match self.release_date.as_deref() {
            None | Some("") => {
                errors.push("releaseDate", "is required");
                None
            }
            Some(raw) => {
                let parsed = parse_release_date(raw);
                if parsed.is_none() {
                    errors.push("releaseDate", "must be a date such as 2024-01-01");
                }
                parsed
            }
        };

        match (title, rating, release_date) {
            (Some(title), Some(rating), Some(release_date)) if errors.is_empty() => Ok(NewMovie {
                title,
                rating,
                release_date,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, rating: &str, release_date: &str) -> MoviePayload {
        MoviePayload {
            title: Some(title.to_string()),
            rating: Some(rating.to_string()),
            release_date: Some(release_date.to_string()),
        }
    }

    #[test]
    fn test_valid_payload() {
        let movie = payload("X", "G", "2024-01-01").validate().unwrap();
        assert_eq!(movie.title, "X");
        assert_eq!(movie.rating, Rating::G);
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_every_rating_is_accepted() {
        for rating in ["G", "PG", "M", "MA", "R"] {
            assert!(payload("X", rating, "2024-01-01").validate().is_ok(), "{rating}");
        }
    }

    #[test]
    fn test_invalid_rating_is_rejected() {
        for rating in ["X", "pg", "NC-17", " G"] {
            let err = payload("X", rating, "2024-01-01").validate().unwrap_err();
            assert_eq!(err.field_names(), vec!["rating"], "{rating}");
        }
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let err = MoviePayload::default().validate().unwrap_err();
        assert_eq!(err.field_names(), vec!["title", "rating", "releaseDate"]);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let err = payload("   ", "G", "2024-01-01").validate().unwrap_err();
        assert_eq!(err.field_names(), vec!["title"]);
    }

    #[test]
    fn test_iso_timestamp_release_date() {
        let movie = payload("X", "R", "2023-02-01T00:00:00.000Z").validate().unwrap();
        assert_eq!(movie.release_date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
    }

    #[test]
    fn test_unparseable_release_date() {
        for date in ["yesterday", "2024-13-01", "01/02/2024"] {
            let err = payload("X", "G", date).validate().unwrap_err();
            assert_eq!(err.field_names(), vec!["releaseDate"], "{date}");
        }
    }

    #[test]
    fn test_movie_id_parsing() {
        assert_eq!(parse_movie_id("1"), Ok(1));
        assert_eq!(parse_movie_id("42"), Ok(42));
        for raw in ["0", "-1", "abc", "", "1.5", "+3", "12abc"] {
            let err = parse_movie_id(raw).unwrap_err();
            assert_eq!(err.field_names(), vec!["id"], "{raw:?}");
        }
    }
}
