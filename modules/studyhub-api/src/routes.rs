use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::routes as auth;
use crate::rest::{catalog, resources, votes};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/", get(|| async { "ok" }))
        // Resources
        .route(
            "/api/resources",
            get(resources::api_resources).post(resources::api_create_resource),
        )
        .route("/api/resources/count", get(resources::api_resources_count))
        .route("/api/resources/batch", get(resources::api_resources_batch))
        .route(
            "/api/resources/batch/count",
            get(resources::api_resources_batch_count),
        )
        .route("/api/resources/search", get(resources::api_search))
        .route("/api/resources/search/count", get(resources::api_search_count))
        .route(
            "/api/resources/{id}",
            get(resources::api_resource_detail).patch(resources::api_update_resource),
        )
        .route(
            "/api/resources/{id}/downloads",
            post(resources::api_record_download),
        )
        .route(
            "/api/resources/{id}/comments",
            get(resources::api_comments).post(resources::api_add_comment),
        )
        // Reference lists
        .route("/api/courses", get(catalog::api_courses))
        .route("/api/subjects", get(catalog::api_subjects))
        .route("/api/document-types", get(catalog::api_document_types))
        // Users
        .route(
            "/api/users/{email}/resources",
            get(resources::api_user_resources),
        )
        .route(
            "/api/users/{email}/resources/count",
            get(resources::api_user_resources_count),
        )
        .route("/api/users/{email}/votes", get(votes::api_user_votes))
        .route(
            "/api/users/{email}/upvote",
            post(votes::api_add_upvote).delete(votes::api_remove_upvote),
        )
        .route(
            "/api/users/{email}/downvote",
            post(votes::api_add_downvote).delete(votes::api_remove_downvote),
        )
        .route(
            "/api/users/{email}/favorites",
            post(votes::api_add_favorite).delete(votes::api_remove_favorite),
        )
        // Auth
        .route("/api/auth/signin", get(auth::signin))
        .route("/api/auth/callback/github", get(auth::github_callback))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/signout", post(auth::signout))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Listings and ledgers change on every vote
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        // Method + path only; emails in query strings stay out of the logs
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
