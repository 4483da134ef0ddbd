use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};

use super::jwt::COOKIE_NAME;
use crate::error::ApiError;
use crate::state::AppState;

/// The signed-in caller. Extract this in handlers that require a session;
/// requests without a valid session are rejected with 401.
/// `Option<AuthSession>` never rejects.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub email: String,
    pub name: String,
}

impl AuthSession {
    /// A caller may only act on their own identity.
    pub fn require_identity(&self, email: &str) -> Result<(), ApiError> {
        if self.email == email {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state).ok_or(ApiError::Unauthorized)
    }
}

impl OptionalFromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolve(parts, state))
    }
}

/// Session token from the `auth_token` cookie, or a bearer token.
fn resolve(parts: &Parts, state: &AppState) -> Option<AuthSession> {
    let token = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| parse_cookie(cookies, COOKIE_NAME))
        .or_else(|| {
            parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })?;

    let claims = state.jwt.verify_token(token.trim()).ok()?;
    Some(AuthSession {
        email: claims.sub,
        name: claims.name,
    })
}

/// Parse a specific cookie from the Cookie header string.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix(name)
            .and_then(|value| value.strip_prefix('='))
    })
}
