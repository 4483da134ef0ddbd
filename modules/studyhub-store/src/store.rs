//! The `ResourceStore` trait: every read and write the application performs.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use studyhub_common::{
    Comment, Course, DocumentType, NewResource, Page, RankedResource, Resource, ResourcePatch,
    ResourceSearchView, StudyHubResult, Subject, UserLedger, Weights,
};

use crate::ledger::MarkKind;
use crate::search::SearchQuery;

/// Persistent collection of resources, their reference entities and the
/// per-user ledger.
///
/// Implemented by `PgStore` (postgres) and `MemoryStore` (tests).
/// Also implemented for `Arc<S>` so one store can be shared across handlers.
///
/// Listings are sorted newest first unless stated otherwise. Counters are
/// never written directly; only `increment_downloads` and the mark
/// operations change them.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    // --- Resources ---

    async fn get_resource(&self, id: Uuid) -> StudyHubResult<Option<Resource>>;

    async fn list_resources(&self, page: Page) -> StudyHubResult<Vec<Resource>>;

    async fn count_resources(&self) -> StudyHubResult<i64>;

    async fn list_resources_by_ids(&self, ids: &[Uuid], page: Page)
        -> StudyHubResult<Vec<Resource>>;

    async fn count_resources_by_ids(&self, ids: &[Uuid]) -> StudyHubResult<i64>;

    async fn list_resources_by_owner(
        &self,
        user_email: &str,
        page: Page,
    ) -> StudyHubResult<Vec<Resource>>;

    async fn count_resources_by_owner(&self, user_email: &str) -> StudyHubResult<i64>;

    /// Resources ordered by popularity, ties newest first.
    async fn list_popular(
        &self,
        page: Page,
        weights: &Weights,
    ) -> StudyHubResult<Vec<RankedResource>>;

    /// Resources whose joined view matches `query`. Resources with an
    /// unresolved subject, course or document type never appear.
    async fn search(
        &self,
        query: &SearchQuery,
        page: Page,
    ) -> StudyHubResult<Vec<ResourceSearchView>>;

    /// Exact number of search matches before pagination. Evaluates the whole
    /// join, so the cost grows with the number of matches.
    async fn count_search(&self, query: &SearchQuery) -> StudyHubResult<i64>;

    async fn create_resource(&self, resource: NewResource) -> StudyHubResult<Resource>;

    /// Merge-patch by id. Returns `None` when the id does not exist.
    async fn update_resource(
        &self,
        id: Uuid,
        patch: ResourcePatch,
    ) -> StudyHubResult<Option<Resource>>;

    /// Atomically add one download. Returns whether the resource exists.
    async fn increment_downloads(&self, id: Uuid) -> StudyHubResult<bool>;

    // --- Reference entities ---

    async fn create_course(&self, name: &str) -> StudyHubResult<Course>;

    async fn create_subject(&self, course_id: Uuid, name: &str) -> StudyHubResult<Subject>;

    async fn create_document_type(&self, name: &str) -> StudyHubResult<DocumentType>;

    async fn list_courses(&self) -> StudyHubResult<Vec<Course>>;

    async fn list_subjects(&self) -> StudyHubResult<Vec<Subject>>;

    async fn list_document_types(&self) -> StudyHubResult<Vec<DocumentType>>;

    // --- Comments ---

    async fn add_comment(
        &self,
        resource_id: Uuid,
        user_email: &str,
        body: &str,
    ) -> StudyHubResult<Comment>;

    /// Comments on a resource, oldest first.
    async fn list_comments(&self, resource_id: Uuid) -> StudyHubResult<Vec<Comment>>;

    async fn count_comments(&self, resource_id: Uuid) -> StudyHubResult<i64>;

    // --- Users ---

    /// Create the user's ledger with empty sets if it does not exist yet.
    /// An existing ledger is returned unchanged apart from the display name.
    async fn ensure_user(&self, email: &str, name: &str) -> StudyHubResult<UserLedger>;

    async fn get_user(&self, email: &str) -> StudyHubResult<Option<UserLedger>>;

    /// Add `resource_id` to the user's `kind` set and bump the matching
    /// counter, as one unit. Returns `false` (and changes nothing) when the
    /// id was already in the set.
    async fn add_mark(&self, email: &str, resource_id: Uuid, kind: MarkKind)
        -> StudyHubResult<bool>;

    /// Remove `resource_id` from the user's `kind` set and lower the matching
    /// counter, as one unit. Returns `false` when the id was not in the set.
    async fn remove_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool>;
}

// ---------------------------------------------------------------------------
// Arc<S> blanket
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: ResourceStore + ?Sized> ResourceStore for Arc<S> {
    async fn get_resource(&self, id: Uuid) -> StudyHubResult<Option<Resource>> {
        (**self).get_resource(id).await
    }

    async fn list_resources(&self, page: Page) -> StudyHubResult<Vec<Resource>> {
        (**self).list_resources(page).await
    }

    async fn count_resources(&self) -> StudyHubResult<i64> {
        (**self).count_resources().await
    }

    async fn list_resources_by_ids(
        &self,
        ids: &[Uuid],
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        (**self).list_resources_by_ids(ids, page).await
    }

    async fn count_resources_by_ids(&self, ids: &[Uuid]) -> StudyHubResult<i64> {
        (**self).count_resources_by_ids(ids).await
    }

    async fn list_resources_by_owner(
        &self,
        user_email: &str,
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        (**self).list_resources_by_owner(user_email, page).await
    }

    async fn count_resources_by_owner(&self, user_email: &str) -> StudyHubResult<i64> {
        (**self).count_resources_by_owner(user_email).await
    }

    async fn list_popular(
        &self,
        page: Page,
        weights: &Weights,
    ) -> StudyHubResult<Vec<RankedResource>> {
        (**self).list_popular(page, weights).await
    }

    async fn search(
        &self,
        query: &SearchQuery,
        page: Page,
    ) -> StudyHubResult<Vec<ResourceSearchView>> {
        (**self).search(query, page).await
    }

    async fn count_search(&self, query: &SearchQuery) -> StudyHubResult<i64> {
        (**self).count_search(query).await
    }

    async fn create_resource(&self, resource: NewResource) -> StudyHubResult<Resource> {
        (**self).create_resource(resource).await
    }

    async fn update_resource(
        &self,
        id: Uuid,
        patch: ResourcePatch,
    ) -> StudyHubResult<Option<Resource>> {
        (**self).update_resource(id, patch).await
    }

    async fn increment_downloads(&self, id: Uuid) -> StudyHubResult<bool> {
        (**self).increment_downloads(id).await
    }

    async fn create_course(&self, name: &str) -> StudyHubResult<Course> {
        (**self).create_course(name).await
    }

    async fn create_subject(&self, course_id: Uuid, name: &str) -> StudyHubResult<Subject> {
        (**self).create_subject(course_id, name).await
    }

    async fn create_document_type(&self, name: &str) -> StudyHubResult<DocumentType> {
        (**self).create_document_type(name).await
    }

    async fn list_courses(&self) -> StudyHubResult<Vec<Course>> {
        (**self).list_courses().await
    }

    async fn list_subjects(&self) -> StudyHubResult<Vec<Subject>> {
        (**self).list_subjects().await
    }

    async fn list_document_types(&self) -> StudyHubResult<Vec<DocumentType>> {
        (**self).list_document_types().await
    }

    async fn add_comment(
        &self,
        resource_id: Uuid,
        user_email: &str,
        body: &str,
    ) -> StudyHubResult<Comment> {
        (**self).add_comment(resource_id, user_email, body).await
    }

    async fn list_comments(&self, resource_id: Uuid) -> StudyHubResult<Vec<Comment>> {
        (**self).list_comments(resource_id).await
    }

    async fn count_comments(&self, resource_id: Uuid) -> StudyHubResult<i64> {
        (**self).count_comments(resource_id).await
    }

    async fn ensure_user(&self, email: &str, name: &str) -> StudyHubResult<UserLedger> {
        (**self).ensure_user(email, name).await
    }

    async fn get_user(&self, email: &str) -> StudyHubResult<Option<UserLedger>> {
        (**self).get_user(email).await
    }

    async fn add_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        (**self).add_mark(email, resource_id, kind).await
    }

    async fn remove_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        (**self).remove_mark(email, resource_id, kind).await
    }
}
