//! In-memory store for tests and local runs. No database required.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use studyhub_common::{
    Comment, Course, DocumentType, NewResource, Page, RankedResource, Resource, ResourcePatch,
    ResourceSearchView, StudyHubResult, Subject, UserLedger, Weights,
};

use crate::ledger::MarkKind;
use crate::ranking;
use crate::search::SearchQuery;
use crate::store::ResourceStore;

#[derive(Default)]
struct MemoryUser {
    name: String,
    favorites: Vec<Uuid>,
    upvoted: Vec<Uuid>,
    downvoted: Vec<Uuid>,
}

impl MemoryUser {
    fn set_mut(&mut self, kind: MarkKind) -> &mut Vec<Uuid> {
        match kind {
            MarkKind::Upvote => &mut self.upvoted,
            MarkKind::Downvote => &mut self.downvoted,
            MarkKind::Favorite => &mut self.favorites,
        }
    }

    fn to_ledger(&self, email: &str) -> UserLedger {
        UserLedger {
            email: email.to_string(),
            name: self.name.clone(),
            favorites: self.favorites.clone(),
            upvoted: self.upvoted.clone(),
            downvoted: self.downvoted.clone(),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    resources: HashMap<Uuid, Resource>,
    courses: HashMap<Uuid, Course>,
    subjects: HashMap<Uuid, Subject>,
    document_types: HashMap<Uuid, DocumentType>,
    comments: Vec<Comment>,
    users: HashMap<String, MemoryUser>,
}

impl MemoryState {
    /// Resources matching `filter`, newest first.
    fn newest_first(&self, filter: impl Fn(&Resource) -> bool) -> Vec<Resource> {
        let mut rows: Vec<Resource> = self
            .resources
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    fn comment_counts(&self) -> HashMap<Uuid, i64> {
        let mut counts = HashMap::new();
        for c in &self.comments {
            *counts.entry(c.resource_id).or_insert(0) += 1;
        }
        counts
    }

    /// Inner join: `None` when any reference is dangling.
    fn join(&self, r: &Resource) -> Option<ResourceSearchView> {
        let document_type = self.document_types.get(&r.document_type_id)?;
        let subject = self.subjects.get(&r.subject_id)?;
        let course = self.courses.get(&r.course_id)?;
        Some(ResourceSearchView::join(r, document_type, subject, course))
    }

    fn search_matches(&self, query: &SearchQuery) -> Vec<ResourceSearchView> {
        self.newest_first(|_| true)
            .iter()
            .filter_map(|r| self.join(r))
            .filter(|view| query.matches(view))
            .collect()
    }

    fn counter_mut(resource: &mut Resource, kind: MarkKind) -> &mut i64 {
        match kind {
            MarkKind::Upvote => &mut resource.upvotes_nr,
            MarkKind::Downvote => &mut resource.downvotes_nr,
            MarkKind::Favorite => &mut resource.favorites_nr,
        }
    }
}

/// Store backed by hash maps behind one lock. Each operation takes the lock
/// once, so set and counter changes in a mark are applied together.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed resource, keeping its id, timestamp and counters.
    /// Lets tests seed exact orderings.
    pub async fn insert_resource(&self, resource: Resource) {
        self.state
            .write()
            .await
            .resources
            .insert(resource.id, resource);
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_resource(&self, id: Uuid) -> StudyHubResult<Option<Resource>> {
        Ok(self.state.read().await.resources.get(&id).cloned())
    }

    async fn list_resources(&self, page: Page) -> StudyHubResult<Vec<Resource>> {
        let state = self.state.read().await;
        Ok(page.slice(&state.newest_first(|_| true)))
    }

    async fn count_resources(&self) -> StudyHubResult<i64> {
        Ok(self.state.read().await.resources.len() as i64)
    }

    async fn list_resources_by_ids(
        &self,
        ids: &[Uuid],
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        let state = self.state.read().await;
        Ok(page.slice(&state.newest_first(|r| ids.contains(&r.id))))
    }

    async fn count_resources_by_ids(&self, ids: &[Uuid]) -> StudyHubResult<i64> {
        let state = self.state.read().await;
        Ok(state.newest_first(|r| ids.contains(&r.id)).len() as i64)
    }

    async fn list_resources_by_owner(
        &self,
        user_email: &str,
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        let state = self.state.read().await;
        Ok(page.slice(&state.newest_first(|r| r.user_email == user_email)))
    }

    async fn count_resources_by_owner(&self, user_email: &str) -> StudyHubResult<i64> {
        let state = self.state.read().await;
        Ok(state.newest_first(|r| r.user_email == user_email).len() as i64)
    }

    async fn list_popular(
        &self,
        page: Page,
        weights: &Weights,
    ) -> StudyHubResult<Vec<RankedResource>> {
        let state = self.state.read().await;
        let ranked = ranking::rank(state.resources.values(), &state.comment_counts(), weights);
        Ok(page.slice(&ranked))
    }

    async fn search(
        &self,
        query: &SearchQuery,
        page: Page,
    ) -> StudyHubResult<Vec<ResourceSearchView>> {
        let state = self.state.read().await;
        Ok(page.slice(&state.search_matches(query)))
    }

    async fn count_search(&self, query: &SearchQuery) -> StudyHubResult<i64> {
        let state = self.state.read().await;
        Ok(state.search_matches(query).len() as i64)
    }

    async fn create_resource(&self, resource: NewResource) -> StudyHubResult<Resource> {
        let created = Resource {
            id: Uuid::new_v4(),
            title: resource.title,
            description: resource.description,
            document_type_id: resource.document_type_id,
            document_format: resource.document_format,
            hashtags: resource.hashtags,
            subject_id: resource.subject_id,
            course_id: resource.course_id,
            user_email: resource.user_email,
            user_name: resource.user_name,
            created_at: Utc::now(),
            favorites_nr: 0,
            upvotes_nr: 0,
            downvotes_nr: 0,
            downloads_nr: 0,
        };
        self.insert_resource(created.clone()).await;
        Ok(created)
    }

    async fn update_resource(
        &self,
        id: Uuid,
        patch: ResourcePatch,
    ) -> StudyHubResult<Option<Resource>> {
        let mut state = self.state.write().await;
        Ok(state.resources.get_mut(&id).map(|r| {
            patch.apply(r);
            r.clone()
        }))
    }

    async fn increment_downloads(&self, id: Uuid) -> StudyHubResult<bool> {
        let mut state = self.state.write().await;
        match state.resources.get_mut(&id) {
            Some(r) => {
                r.downloads_nr += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_course(&self, name: &str) -> StudyHubResult<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state
            .write()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(course)
    }

    async fn create_subject(&self, course_id: Uuid, name: &str) -> StudyHubResult<Subject> {
        let subject = Subject {
            id: Uuid::new_v4(),
            course_id,
            name: name.to_string(),
        };
        self.state
            .write()
            .await
            .subjects
            .insert(subject.id, subject.clone());
        Ok(subject)
    }

    async fn create_document_type(&self, name: &str) -> StudyHubResult<DocumentType> {
        let document_type = DocumentType {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state
            .write()
            .await
            .document_types
            .insert(document_type.id, document_type.clone());
        Ok(document_type)
    }

    async fn list_courses(&self) -> StudyHubResult<Vec<Course>> {
        let mut courses: Vec<Course> = self.state.read().await.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courses)
    }

    async fn list_subjects(&self) -> StudyHubResult<Vec<Subject>> {
        let mut subjects: Vec<Subject> =
            self.state.read().await.subjects.values().cloned().collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn list_document_types(&self) -> StudyHubResult<Vec<DocumentType>> {
        let mut types: Vec<DocumentType> = self
            .state
            .read()
            .await
            .document_types
            .values()
            .cloned()
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn add_comment(
        &self,
        resource_id: Uuid,
        user_email: &str,
        body: &str,
    ) -> StudyHubResult<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            resource_id,
            user_email: user_email.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.state.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, resource_id: Uuid) -> StudyHubResult<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn count_comments(&self, resource_id: Uuid) -> StudyHubResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.resource_id == resource_id)
            .count() as i64)
    }

    async fn ensure_user(&self, email: &str, name: &str) -> StudyHubResult<UserLedger> {
        let mut state = self.state.write().await;
        let user = state.users.entry(email.to_string()).or_default();
        if !name.is_empty() {
            user.name = name.to_string();
        }
        Ok(user.to_ledger(email))
    }

    async fn get_user(&self, email: &str) -> StudyHubResult<Option<UserLedger>> {
        let state = self.state.read().await;
        Ok(state.users.get(email).map(|u| u.to_ledger(email)))
    }

    async fn add_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(resource) = state.resources.get_mut(&resource_id) else {
            return Ok(false);
        };
        let set = state.users.entry(email.to_string()).or_default().set_mut(kind);
        if set.contains(&resource_id) {
            return Ok(false);
        }

        set.push(resource_id);
        *MemoryState::counter_mut(resource, kind) += 1;
        Ok(true)
    }

    async fn remove_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(user) = state.users.get_mut(email) else {
            return Ok(false);
        };
        let set = user.set_mut(kind);
        let Some(pos) = set.iter().position(|id| *id == resource_id) else {
            return Ok(false);
        };

        set.remove(pos);
        if let Some(resource) = state.resources.get_mut(&resource_id) {
            let counter = MemoryState::counter_mut(resource, kind);
            *counter = (*counter - 1).max(0);
        }
        Ok(true)
    }
}
