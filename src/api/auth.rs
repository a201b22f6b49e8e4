//! Bearer JWT verification for the crawl trigger
//!
//! Tokens are issued elsewhere; this side only verifies them:
//! - HS256 signature against `api.jwt-secret`
//! - `exp` present and in the future
//! - `sub` present and non-empty

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims accepted on a trigger token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Reasons a trigger request is rejected
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no JWT secret configured")]
    NoSecret,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token subject is empty")]
    EmptySubject,
}

/// Verifies the `Authorization: Bearer <jwt>` header
///
/// With no configured secret every request is rejected.
pub fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<Claims, AuthError> {
    let secret = secret.ok_or(AuthError::NoSecret)?;
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    verify_token(token, secret)
}

/// Decodes and validates one HS256 token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?
    .claims;

    if claims.sub.trim().is_empty() {
        return Err(AuthError::EmptySubject);
    }
    Ok(claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
