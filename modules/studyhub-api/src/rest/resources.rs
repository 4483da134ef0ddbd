use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use studyhub_common::{Comment, NewResource, Resource, ResourcePatch, ResourceSearchView};
use studyhub_store::{ResourceStore, SearchQuery};

use super::{
    parse_ids, parse_uuid, BatchQuery, CountResponse, ListQuery, PageQuery, SearchParams,
    SortMode,
};
use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceBody {
    title: String,
    #[serde(default)]
    description: String,
    document_type_id: Uuid,
    document_format: String,
    #[serde(default)]
    hashtags: String,
    subject_id: Uuid,
    course_id: Uuid,
}

#[derive(Deserialize)]
pub struct CommentBody {
    body: String,
}

// --- Listings ---

pub async fn api_resources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let page = state.page(params.page);
    let response = match params.sort {
        SortMode::Newest => Json(state.store.list_resources(page).await?).into_response(),
        SortMode::Popular => {
            Json(state.store.list_popular(page, &state.config.weights).await?).into_response()
        }
    };
    Ok(response)
}

pub async fn api_resources_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.store.count_resources().await?;
    Ok(Json(CountResponse { count }))
}

pub async fn api_resources_batch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchQuery>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    let ids = parse_ids(params.ids.as_deref())?;
    let page = state.page(params.page);
    Ok(Json(state.store.list_resources_by_ids(&ids, page).await?))
}

pub async fn api_resources_batch_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let ids = parse_ids(params.ids.as_deref())?;
    let count = state.store.count_resources_by_ids(&ids).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ResourceSearchView>>, ApiError> {
    let query = SearchQuery::new(params.q.as_deref().unwrap_or_default());
    let page = state.page(params.page);
    Ok(Json(state.store.search(&query, page).await?))
}

pub async fn api_search_count(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<CountResponse>, ApiError> {
    let query = SearchQuery::new(params.q.as_deref().unwrap_or_default());
    let count = state.store.count_search(&query).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn api_user_resources(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Vec<Resource>>, ApiError> {
    let page = state.page(params.page);
    Ok(Json(state.store.list_resources_by_owner(&email, page).await?))
}

pub async fn api_user_resources_count(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.store.count_resources_by_owner(&email).await?;
    Ok(Json(CountResponse { count }))
}

// --- Single resource ---

pub async fn api_resource_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Resource>, ApiError> {
    let id = parse_uuid(&id)?;
    state
        .store
        .get_resource(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Upload a resource record. The session user becomes the owner.
pub async fn api_create_resource(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(body): Json<CreateResourceBody>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }

    let resource = state
        .store
        .create_resource(NewResource {
            title: title.to_string(),
            description: body.description,
            document_type_id: body.document_type_id,
            document_format: body.document_format,
            hashtags: body.hashtags,
            subject_id: body.subject_id,
            course_id: body.course_id,
            user_email: session.email,
            user_name: session.name,
        })
        .await?;

    info!(resource_id = %resource.id, "Resource created");
    Ok((StatusCode::CREATED, Json(resource)))
}

/// Merge-patch a resource. Only its owner may edit it.
pub async fn api_update_resource(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(patch): Json<ResourcePatch>,
) -> Result<Json<Resource>, ApiError> {
    let id = parse_uuid(&id)?;
    let existing = state
        .store
        .get_resource(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    session.require_identity(&existing.user_email)?;

    if patch
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(ApiError::bad_request("Title is required"));
    }
    if patch.is_empty() {
        return Ok(Json(existing));
    }

    state
        .store
        .update_resource(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn api_record_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&id)?;
    if state.store.increment_downloads(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Comments ---

pub async fn api_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let id = parse_uuid(&id)?;
    Ok(Json(state.store.list_comments(id).await?))
}

pub async fn api_add_comment(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let id = parse_uuid(&id)?;
    let text = body.body.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment is empty"));
    }
    if state.store.get_resource(id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let comment = state.store.add_comment(id, &session.email, text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
