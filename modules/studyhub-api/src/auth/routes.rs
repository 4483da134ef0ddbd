use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use studyhub_store::ResourceStore;

use super::jwt::{clear_session_cookie, session_cookie};
use super::session::{parse_cookie, AuthSession};
use crate::state::AppState;

const STATE_COOKIE: &str = "oauth_state";
const STATE_MAX_AGE_SECS: i64 = 600;

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
pub struct SessionUser {
    email: String,
    name: String,
}

#[derive(Serialize)]
pub struct SessionView {
    user: SessionUser,
}

fn state_cookie(value: &str) -> String {
    format!("{STATE_COOKIE}={value}; Path=/api/auth; HttpOnly; SameSite=Lax; Max-Age={STATE_MAX_AGE_SECS}")
}

fn clear_state_cookie() -> String {
    format!("{STATE_COOKIE}=; Path=/api/auth; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Redirect to the sign-in error page with an error code in the query string.
fn error_redirect(state: &AppState, code: &str) -> Response {
    let base = state.config.base_url.trim_end_matches('/');
    (
        [(header::SET_COOKIE, clear_state_cookie())],
        Redirect::to(&format!("{base}/auth/error?error={code}")),
    )
        .into_response()
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Start a GitHub sign-in.
pub async fn signin(State(state): State<Arc<AppState>>) -> Response {
    let csrf = Uuid::new_v4().to_string();
    match state.github.authorize_url(&csrf) {
        Ok(url) => (
            [(header::SET_COOKIE, state_cookie(&csrf))],
            Redirect::to(&url),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to build GitHub authorize URL");
            error_redirect(&state, "OAuthSignin")
        }
    }
}

/// GitHub redirects here after the user approves (or denies) the app.
pub async fn github_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = params.error {
        info!(%error, "GitHub sign-in denied");
        return error_redirect(&state, "AccessDenied");
    }

    let expected = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| parse_cookie(cookies, STATE_COOKIE));
    let state_ok = match (expected, params.state.as_deref()) {
        (Some(expected), Some(got)) => constant_time_eq(expected.as_bytes(), got.as_bytes()),
        _ => false,
    };
    let Some(code) = params.code.filter(|_| state_ok) else {
        warn!("OAuth callback with missing code or mismatched state");
        return error_redirect(&state, "OAuthCallback");
    };

    let identity = match state.github.exchange_code(&code).await {
        Ok(token) => state.github.fetch_identity(&token).await,
        Err(e) => Err(e),
    };
    let identity = match identity {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "GitHub sign-in failed");
            return error_redirect(&state, "OAuthCallback");
        }
    };

    // First sign-in creates the user's ledger with empty sets.
    if let Err(e) = state.store.ensure_user(&identity.email, &identity.name).await {
        warn!(error = %e, "Failed to record signed-in user");
        return error_redirect(&state, "OAuthCallback");
    }

    let token = match state.jwt.create_token(&identity.email, &identity.name) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Failed to sign session token");
            return error_redirect(&state, "OAuthCallback");
        }
    };

    info!("User signed in");
    let mut response = Redirect::to(&state.config.base_url).into_response();
    let cookies = response.headers_mut();
    for value in [session_cookie(&token), clear_state_cookie()] {
        if let Ok(value) = value.parse::<HeaderValue>() {
            cookies.append(header::SET_COOKIE, value);
        }
    }
    response
}

/// The current session, or `null` when signed out.
pub async fn session(session: Option<AuthSession>) -> Json<Option<SessionView>> {
    Json(session.map(|s| SessionView {
        user: SessionUser {
            email: s.email,
            name: s.name,
        },
    }))
}

pub async fn signout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({ "message": "Signed out" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_compares_content() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn state_cookie_is_scoped_to_auth_routes() {
        let cookie = state_cookie("nonce");
        assert!(cookie.starts_with("oauth_state=nonce;"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(clear_state_cookie().contains("Max-Age=0"));
    }
}
