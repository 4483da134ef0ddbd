use std::sync::Arc;

use axum::{extract::State, response::Json};

use studyhub_common::{Course, DocumentType, Subject};
use studyhub_store::ResourceStore;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn api_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.store.list_courses().await?))
}

pub async fn api_subjects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Subject>>, ApiError> {
    Ok(Json(state.store.list_subjects().await?))
}

pub async fn api_document_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DocumentType>>, ApiError> {
    Ok(Json(state.store.list_document_types().await?))
}
