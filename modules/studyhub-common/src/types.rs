use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Resources ---

/// A shared study resource. Counters are only ever changed through the
/// store's increment and ledger operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub document_type_id: Uuid,
    pub document_format: String,
    pub hashtags: String,
    pub subject_id: Uuid,
    pub course_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub favorites_nr: i64,
    pub upvotes_nr: i64,
    pub downvotes_nr: i64,
    pub downloads_nr: i64,
}

/// Fields supplied when a resource is uploaded. The store assigns the id,
/// the creation time and zeroed counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub document_type_id: Uuid,
    pub document_format: String,
    #[serde(default)]
    pub hashtags: String,
    pub subject_id: Uuid,
    pub course_id: Uuid,
    pub user_email: String,
    pub user_name: String,
}

/// Merge-patch for a resource. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub document_type_id: Option<Uuid>,
    pub document_format: Option<String>,
    pub hashtags: Option<String>,
    pub subject_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

impl ResourcePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.document_type_id.is_none()
            && self.document_format.is_none()
            && self.hashtags.is_none()
            && self.subject_id.is_none()
            && self.course_id.is_none()
    }

    /// Apply the patch in place. Used by stores that hold records in memory.
    pub fn apply(&self, resource: &mut Resource) {
        if let Some(title) = &self.title {
            resource.title = title.clone();
        }
        if let Some(description) = &self.description {
            resource.description = description.clone();
        }
        if let Some(id) = self.document_type_id {
            resource.document_type_id = id;
        }
        if let Some(format) = &self.document_format {
            resource.document_format = format.clone();
        }
        if let Some(hashtags) = &self.hashtags {
            resource.hashtags = hashtags.clone();
        }
        if let Some(id) = self.subject_id {
            resource.subject_id = id;
        }
        if let Some(id) = self.course_id {
            resource.course_id = id;
        }
    }
}

/// A resource with its popularity score, as returned by the popular listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResource {
    #[serde(flatten)]
    pub resource: Resource,
    pub comment_count: i64,
    pub popularity: f64,
}

// --- Reference entities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub user_email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// --- Search projection ---

/// A resource joined with its subject, course and document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSearchView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub document_type: DocumentType,
    pub document_format: String,
    pub user_email: String,
    pub user_name: String,
    pub hashtags: String,
    pub subject: Subject,
    pub course: Course,
    pub created_at: DateTime<Utc>,
    pub favorites_nr: i64,
    pub upvotes_nr: i64,
    pub downvotes_nr: i64,
    pub downloads_nr: i64,
}

impl ResourceSearchView {
    pub fn join(
        resource: &Resource,
        document_type: &DocumentType,
        subject: &Subject,
        course: &Course,
    ) -> Self {
        Self {
            id: resource.id,
            title: resource.title.clone(),
            description: resource.description.clone(),
            document_type: document_type.clone(),
            document_format: resource.document_format.clone(),
            user_email: resource.user_email.clone(),
            user_name: resource.user_name.clone(),
            hashtags: resource.hashtags.clone(),
            subject: subject.clone(),
            course: course.clone(),
            created_at: resource.created_at,
            favorites_nr: resource.favorites_nr,
            upvotes_nr: resource.upvotes_nr,
            downvotes_nr: resource.downvotes_nr,
            downloads_nr: resource.downloads_nr,
        }
    }

    /// The nine text fields a search query is matched against.
    pub fn searchable_fields(&self) -> [&str; 9] {
        [
            &self.title,
            &self.description,
            &self.document_type.name,
            &self.document_format,
            &self.user_email,
            &self.user_name,
            &self.hashtags,
            &self.subject.name,
            &self.course.name,
        ]
    }
}

// --- Users ---

/// A user's ledger: the resources they marked as favorite, upvoted or downvoted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLedger {
    pub email: String,
    pub name: String,
    pub favorites: Vec<Uuid>,
    pub upvoted: Vec<Uuid>,
    pub downvoted: Vec<Uuid>,
}

// --- Pagination ---

/// A zero-indexed, fixed-size page of a sorted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    pub fn offset(&self) -> i64 {
        self.number as i64 * self.size as i64
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    /// Slice an already sorted, fully materialized result set.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset() as usize)
            .take(self.size as usize)
            .cloned()
            .collect()
    }
}
