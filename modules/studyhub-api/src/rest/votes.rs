//! Upvote, downvote and favorite routes over the vote ledger.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use studyhub_common::UserLedger;
use studyhub_store::{MarkKind, ResourceStore};

use super::MessageResponse;
use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    resource_id: Option<String>,
}

#[derive(Clone, Copy)]
enum Action {
    Add,
    Remove,
}

fn confirmation(kind: MarkKind, action: Action) -> &'static str {
    match (kind, action) {
        (MarkKind::Upvote, Action::Add) => "Upvote added",
        (MarkKind::Upvote, Action::Remove) => "Upvote removed",
        (MarkKind::Downvote, Action::Add) => "Downvote added",
        (MarkKind::Downvote, Action::Remove) => "Downvote removed",
        (MarkKind::Favorite, Action::Add) => "Favorite added",
        (MarkKind::Favorite, Action::Remove) => "Favorite removed",
    }
}

/// Check the caller and target, then apply one ledger mutation.
///
/// The body is taken as a `Result` so a missing or malformed body is only
/// reported after the identity checks.
async fn apply_mark(
    state: &AppState,
    session: &AuthSession,
    email: &str,
    body: Result<Json<VoteBody>, JsonRejection>,
    kind: MarkKind,
    action: Action,
) -> Result<Json<MessageResponse>, ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::bad_request("No user email provided"));
    }
    session.require_identity(email)?;

    let resource_id = body
        .ok()
        .and_then(|Json(body)| body.resource_id)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(|| ApiError::bad_request("No resource id provided"))?;

    if state.store.get_resource(resource_id).await?.is_none() {
        return Err(ApiError::bad_request("Resource does not exist"));
    }

    match action {
        Action::Add => state.ledger.add(email, resource_id, kind).await?,
        Action::Remove => state.ledger.remove(email, resource_id, kind).await?,
    };

    Ok(Json(MessageResponse::new(confirmation(kind, action))))
}

pub async fn api_add_upvote(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Upvote, Action::Add).await
}

pub async fn api_remove_upvote(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Upvote, Action::Remove).await
}

pub async fn api_add_downvote(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Downvote, Action::Add).await
}

pub async fn api_remove_downvote(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Downvote, Action::Remove).await
}

pub async fn api_add_favorite(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Favorite, Action::Add).await
}

pub async fn api_remove_favorite(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    apply_mark(&state, &session, &email, body, MarkKind::Favorite, Action::Remove).await
}

/// The caller's own ledger. Users who never marked anything get empty sets.
pub async fn api_user_votes(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(email): Path<String>,
) -> Result<Json<UserLedger>, ApiError> {
    session.require_identity(&email)?;
    let ledger = state.store.get_user(&email).await?.unwrap_or_else(|| UserLedger {
        email: session.email.clone(),
        name: session.name.clone(),
        ..Default::default()
    });
    Ok(Json(ledger))
}
