use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// Lifetime of an issued token. Tokens are never refreshed; the caller signs
/// in again once this window has passed.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Claims
///
/// The payload signed into every bearer token. Serialised with the same
/// camelCase keys the browser client reads (`userId`, `email`, `role`) plus
/// the registered `iat`/`exp` timestamps (seconds since the Unix epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    /// Kept as the raw string so the access policy can deny values it does
    /// not recognise instead of the codec rejecting them.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// TokenSubject
///
/// The identity a token is minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

impl Claims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// TokenCodec
///
/// Signs and verifies HS256 bearer tokens with a secret injected at
/// construction. Holds no other state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a token for `subject` that expires [`TOKEN_TTL_SECS`] from now.
    pub fn issue(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue_at(subject, chrono::Utc::now().timestamp())
    }

    /// Mint a token as if it had been issued at `issued_at`.
    pub fn issue_at(&self, subject: &TokenSubject, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: subject.user_id,
            email: subject.email.clone(),
            role: subject.role.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims unchanged.
    ///
    /// Expiry is judged before the signature, so a stale token always
    /// reports [`TokenError::Expired`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if !has_token_shape(token) {
            return Err(TokenError::Malformed);
        }

        let mut unsigned = strict_validation();
        unsigned.insecure_disable_signature_validation();
        decode::<Claims>(token, &self.decoding, &unsigned).map_err(classify)?;

        decode::<Claims>(token, &self.decoding, &strict_validation())
            .map(|data| data.claims)
            .map_err(classify)
    }
}

/// Structural check only: three non-empty dot-separated segments. Says
/// nothing about the signature.
pub fn has_token_shape(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
        _ => TokenError::Malformed,
    }
}
