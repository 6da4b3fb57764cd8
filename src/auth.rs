use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    error::AppError,
    policy::{self, Operation},
    token::{self, Claims, TokenCodec, TokenError},
};

/// Name of the cookie that carries the bearer token.
pub const AUTH_COOKIE: &str = "auth-token";

/// Path prefixes the edge gate screens before routing.
const GATED_PREFIXES: [&str; 2] = ["/movie", "/api/movies"];

/// AuthError
///
/// Why the Auth Gate refused a request. Codec failures are carried through
/// unchanged inside `InvalidToken`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No token provided")]
    NoToken,
    #[error("Invalid token")]
    InvalidToken(#[source] TokenError),
}

/// authenticate
///
/// Reads the `auth-token` cookie from `headers` and fully verifies it.
/// Read-only on the request.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<Claims, AuthError> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(AUTH_COOKIE).ok_or(AuthError::NoToken)?;

    codec.verify(token.value()).map_err(AuthError::InvalidToken)
}

/// AuthUser
///
/// The verified identity of the caller, resolved from the token alone (no
/// store lookup). Handlers that need fresh account data, such as `me`,
/// look the user up themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    /// Raw role string from the token; the access policy decides what it means.
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl AuthUser {
    /// Applies the role matrix for `operation`, rejecting with 403.
    pub fn authorize(&self, operation: Operation) -> Result<(), AppError> {
        if policy::is_allowed(&self.role, operation) {
            return Ok(());
        }

        tracing::warn!(
            user_id = self.id,
            role = %self.role,
            operation = %operation,
            "Access policy denied operation"
        );
        Err(AppError::Forbidden(format!(
            "Role {} may not {} movies",
            self.role, operation
        )))
    }
}

/// AuthUser Extractor Implementation
///
/// Runs the Auth Gate for any handler that takes `AuthUser` as an argument.
/// Rejects with 401 when the cookie is missing or fails verification.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenCodec: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = TokenCodec::from_ref(state);

        match authenticate(&parts.headers, &codec) {
            Ok(claims) => Ok(claims.into()),
            Err(e) => {
                tracing::debug!(error = ?e, "Authentication failed");
                Err(e.into())
            }
        }
    }
}

/// edge_gate
///
/// Cheap screen run in front of the router for the catalog page and the
/// movie API. Only checks that the cookie exists and has three segments;
/// handlers still verify the token in full before doing anything.
///
/// API paths are rejected with 401, page paths are redirected to `/`.
pub async fn edge_gate(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !GATED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }

    let is_api = path.starts_with("/api/");
    let jar = CookieJar::from_headers(request.headers());
    let rejection = match jar.get(AUTH_COOKIE) {
        None => Some("Unauthorized"),
        Some(cookie) if !token::has_token_shape(cookie.value()) => Some("Invalid token"),
        Some(_) => None,
    };

    match rejection {
        None => next.run(request).await,
        Some(reason) if is_api => AppError::Unauthenticated(reason.to_string()).into_response(),
        Some(_) => Redirect::to("/").into_response(),
    }
}

/// Cookie carrying a freshly issued token.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Removal cookie for sign-out; must match the path used by [`session_cookie`].
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenSubject;
    use axum::http::{HeaderValue, header};

    const SECRET: &str = "gate-test-secret";

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {AUTH_COOKIE}={value}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_cookie_is_no_token() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(
            authenticate(&HeaderMap::new(), &codec),
            Err(AuthError::NoToken)
        );
    }

    #[test]
    fn test_codec_failure_is_passed_through() {
        let codec = TokenCodec::new(SECRET);
        assert_eq!(
            authenticate(&headers_with_cookie("a.b"), &codec),
            Err(AuthError::InvalidToken(TokenError::Malformed))
        );
    }

    #[test]
    fn test_valid_cookie_yields_claims() {
        let codec = TokenCodec::new(SECRET);
        let subject = TokenSubject {
            user_id: 3,
            email: "floorstaff@test.com".into(),
            role: "FLOORSTAFF".into(),
        };
        let token = codec.issue(&subject).unwrap();

        let claims = authenticate(&headers_with_cookie(&token), &codec).unwrap();
        assert_eq!(claims.subject(), subject);
    }

    #[test]
    fn test_authorize_denies_delete_for_teamleader() {
        let user = AuthUser {
            id: 2,
            email: "tl@test.com".into(),
            role: "TEAMLEADER".into(),
        };
        assert!(user.authorize(Operation::Update).is_ok());
        assert!(matches!(
            user.authorize(Operation::Delete),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("a.b.c".into(), true).to_string();
        assert!(cookie.starts_with("auth-token=a.b.c"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
    }
}
