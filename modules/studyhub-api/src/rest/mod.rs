pub mod catalog;
pub mod resources;
pub mod votes;


use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

// --- Query structs ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    #[serde(alias = "all")]
    Newest,
    Popular,
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<u32>,
    #[serde(default)]
    sort: SortMode,
}

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

#[derive(Deserialize)]
pub struct BatchQuery {
    ids: Option<String>,
    page: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
}

// --- Responses ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
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

// --- Helpers ---

fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid id"))
}

/// Comma-separated ids. Blank entries are skipped; any malformed id fails the
/// whole request.
fn parse_ids(raw: Option<&str>) -> Result<Vec<Uuid>, ApiError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_uuid)
        .collect()
}
