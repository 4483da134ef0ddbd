//! PgStore: the production store backed by Postgres.
//!
//! Counters are only changed by single-statement updates (`x = x + 1`), and
//! each mark pairs its set change with its counter change in one statement,
//! so concurrent requests can neither lose nor double-count an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use studyhub_common::{
    Comment, Course, DocumentType, NewResource, Page, RankedResource, Resource, ResourcePatch,
    ResourceSearchView, StudyHubResult, Subject, UserLedger, Weights,
};

use crate::ledger::MarkKind;
use crate::ranking::POPULARITY_SQL;
use crate::search::{SearchQuery, SEARCH_FROM_SQL};
use crate::store::ResourceStore;

/// Idempotent schema. Resource references to subjects, courses and document
/// types carry no foreign keys; dangling references are tolerated and
/// filtered out by the search join.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    id    UUID PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subjects (
    id         UUID PRIMARY KEY,
    course_id  UUID NOT NULL,
    name       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_types (
    id    UUID PRIMARY KEY,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resources (
    id                UUID         PRIMARY KEY,
    title             TEXT         NOT NULL,
    description       TEXT         NOT NULL DEFAULT '',
    document_type_id  UUID         NOT NULL,
    document_format   TEXT         NOT NULL,
    hashtags          TEXT         NOT NULL DEFAULT '',
    subject_id        UUID         NOT NULL,
    course_id         UUID         NOT NULL,
    user_email        TEXT         NOT NULL,
    user_name         TEXT         NOT NULL,
    created_at        TIMESTAMPTZ  NOT NULL DEFAULT now(),
    favorites_nr      BIGINT       NOT NULL DEFAULT 0 CHECK (favorites_nr >= 0),
    upvotes_nr        BIGINT       NOT NULL DEFAULT 0 CHECK (upvotes_nr >= 0),
    downvotes_nr      BIGINT       NOT NULL DEFAULT 0 CHECK (downvotes_nr >= 0),
    downloads_nr      BIGINT       NOT NULL DEFAULT 0 CHECK (downloads_nr >= 0)
);

CREATE INDEX IF NOT EXISTS resources_created_at_idx ON resources (created_at DESC, id);
CREATE INDEX IF NOT EXISTS resources_user_email_idx ON resources (user_email);

CREATE TABLE IF NOT EXISTS comments (
    id           UUID         PRIMARY KEY,
    resource_id  UUID         NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    user_email   TEXT         NOT NULL,
    body         TEXT         NOT NULL,
    created_at   TIMESTAMPTZ  NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS comments_resource_id_idx ON comments (resource_id);

CREATE TABLE IF NOT EXISTS users (
    email       TEXT         PRIMARY KEY,
    name        TEXT         NOT NULL DEFAULT '',
    created_at  TIMESTAMPTZ  NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS user_upvotes (
    user_email   TEXT         NOT NULL,
    resource_id  UUID         NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
    PRIMARY KEY (user_email, resource_id)
);

CREATE TABLE IF NOT EXISTS user_downvotes (
    user_email   TEXT         NOT NULL,
    resource_id  UUID         NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
    PRIMARY KEY (user_email, resource_id)
);

CREATE TABLE IF NOT EXISTS user_favorites (
    user_email   TEXT         NOT NULL,
    resource_id  UUID         NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
    PRIMARY KEY (user_email, resource_id)
);
"#;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct RankedRow {
    #[sqlx(flatten)]
    resource: Resource,
    comment_count: i64,
    popularity: f64,
}

impl From<RankedRow> for RankedResource {
    fn from(row: RankedRow) -> Self {
        RankedResource {
            resource: row.resource,
            comment_count: row.comment_count,
            popularity: row.popularity,
        }
    }
}

/// Flat row of the resource ⨝ document type ⨝ subject ⨝ course join.
#[derive(sqlx::FromRow)]
struct SearchRow {
    id: Uuid,
    title: String,
    description: String,
    document_type_id: Uuid,
    document_type_name: String,
    document_format: String,
    user_email: String,
    user_name: String,
    hashtags: String,
    subject_id: Uuid,
    subject_course_id: Uuid,
    subject_name: String,
    course_id: Uuid,
    course_name: String,
    created_at: DateTime<Utc>,
    favorites_nr: i64,
    upvotes_nr: i64,
    downvotes_nr: i64,
    downloads_nr: i64,
}

impl From<SearchRow> for ResourceSearchView {
    fn from(r: SearchRow) -> Self {
        ResourceSearchView {
            id: r.id,
            title: r.title,
            description: r.description,
            document_type: DocumentType {
                id: r.document_type_id,
                name: r.document_type_name,
            },
            document_format: r.document_format,
            user_email: r.user_email,
            user_name: r.user_name,
            hashtags: r.hashtags,
            subject: Subject {
                id: r.subject_id,
                course_id: r.subject_course_id,
                name: r.subject_name,
            },
            course: Course {
                id: r.course_id,
                name: r.course_name,
            },
            created_at: r.created_at,
            favorites_nr: r.favorites_nr,
            upvotes_nr: r.upvotes_nr,
            downvotes_nr: r.downvotes_nr,
            downloads_nr: r.downloads_nr,
        }
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StudyHubResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn ensure_schema(&self) -> StudyHubResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Database schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn mark_set(&self, email: &str, kind: MarkKind) -> StudyHubResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(&format!(
            "SELECT resource_id FROM {} WHERE user_email = $1 ORDER BY created_at ASC, resource_id ASC",
            kind.table()
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl ResourceStore for PgStore {
    async fn get_resource(&self, id: Uuid) -> StudyHubResult<Option<Resource>> {
        let row = sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_resources(&self, page: Page) -> StudyHubResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources ORDER BY created_at DESC, id ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_resources(&self) -> StudyHubResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_resources_by_ids(
        &self,
        ids: &[Uuid],
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE id = ANY($1)
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(ids)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_resources_by_ids(&self, ids: &[Uuid]) -> StudyHubResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources WHERE id = ANY($1)")
                .bind(ids)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_resources_by_owner(
        &self,
        user_email: &str,
        page: Page,
    ) -> StudyHubResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE user_email = $1
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_email)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_resources_by_owner(&self, user_email: &str) -> StudyHubResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources WHERE user_email = $1")
                .bind(user_email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_popular(
        &self,
        page: Page,
        weights: &Weights,
    ) -> StudyHubResult<Vec<RankedResource>> {
        let sql = format!(
            r#"
            SELECT r.*,
                   COALESCE(c.comment_count, 0) AS comment_count,
                   {POPULARITY_SQL} AS popularity
            FROM resources r
            LEFT JOIN (
                SELECT resource_id, COUNT(*) AS comment_count
                FROM comments
                GROUP BY resource_id
            ) c ON c.resource_id = r.id
            ORDER BY popularity DESC, r.created_at DESC, r.id ASC
            LIMIT $6 OFFSET $7
            "#
        );

        let rows = sqlx::query_as::<_, RankedRow>(&sql)
            .bind(weights.upvotes)
            .bind(weights.downvotes)
            .bind(weights.favorites)
            .bind(weights.downloads)
            .bind(weights.comments)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RankedResource::from).collect())
    }

    async fn search(
        &self,
        query: &SearchQuery,
        page: Page,
    ) -> StudyHubResult<Vec<ResourceSearchView>> {
        let sql = format!(
            r#"
            SELECT r.id, r.title, r.description,
                   dt.id AS document_type_id, dt.name AS document_type_name,
                   r.document_format, r.user_email, r.user_name, r.hashtags,
                   s.id AS subject_id, s.course_id AS subject_course_id, s.name AS subject_name,
                   co.id AS course_id, co.name AS course_name,
                   r.created_at, r.favorites_nr, r.upvotes_nr, r.downvotes_nr, r.downloads_nr
            {SEARCH_FROM_SQL}
            ORDER BY r.created_at DESC, r.id ASC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, SearchRow>(&sql)
            .bind(query.like_pattern())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ResourceSearchView::from).collect())
    }

    async fn count_search(&self, query: &SearchQuery) -> StudyHubResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {SEARCH_FROM_SQL}"))
            .bind(query.like_pattern())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_resource(&self, resource: NewResource) -> StudyHubResult<Resource> {
        let row = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (
                id, title, description, document_type_id, document_format,
                hashtags, subject_id, course_id, user_email, user_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&resource.title)
        .bind(&resource.description)
        .bind(resource.document_type_id)
        .bind(&resource.document_format)
        .bind(&resource.hashtags)
        .bind(resource.subject_id)
        .bind(resource.course_id)
        .bind(&resource.user_email)
        .bind(&resource.user_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_resource(
        &self,
        id: Uuid,
        patch: ResourcePatch,
    ) -> StudyHubResult<Option<Resource>> {
        let row = sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                document_type_id = COALESCE($4, document_type_id),
                document_format = COALESCE($5, document_format),
                hashtags = COALESCE($6, hashtags),
                subject_id = COALESCE($7, subject_id),
                course_id = COALESCE($8, course_id)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.document_type_id)
        .bind(patch.document_format)
        .bind(patch.hashtags)
        .bind(patch.subject_id)
        .bind(patch.course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn increment_downloads(&self, id: Uuid) -> StudyHubResult<bool> {
        let result =
            sqlx::query("UPDATE resources SET downloads_nr = downloads_nr + 1 WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_course(&self, name: &str) -> StudyHubResult<Course> {
        let row = sqlx::query_as::<_, Course>(
            "INSERT INTO courses (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_subject(&self, course_id: Uuid, name: &str) -> StudyHubResult<Subject> {
        let row = sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (id, course_id, name) VALUES ($1, $2, $3) RETURNING id, course_id, name",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_document_type(&self, name: &str) -> StudyHubResult<DocumentType> {
        let row = sqlx::query_as::<_, DocumentType>(
            "INSERT INTO document_types (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_courses(&self) -> StudyHubResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, Course>("SELECT id, name FROM courses ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_subjects(&self) -> StudyHubResult<Vec<Subject>> {
        let rows = sqlx::query_as::<_, Subject>(
            "SELECT id, course_id, name FROM subjects ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_document_types(&self) -> StudyHubResult<Vec<DocumentType>> {
        let rows =
            sqlx::query_as::<_, DocumentType>("SELECT id, name FROM document_types ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn add_comment(
        &self,
        resource_id: Uuid,
        user_email: &str,
        body: &str,
    ) -> StudyHubResult<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, resource_id, user_email, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, resource_id, user_email, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resource_id)
        .bind(user_email)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_comments(&self, resource_id: Uuid) -> StudyHubResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, resource_id, user_email, body, created_at
            FROM comments
            WHERE resource_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_comments(&self, resource_id: Uuid) -> StudyHubResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE resource_id = $1")
                .bind(resource_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn ensure_user(&self, email: &str, name: &str) -> StudyHubResult<UserLedger> {
        sqlx::query(
            r#"
            INSERT INTO users (email, name) VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET
                name = CASE WHEN EXCLUDED.name = '' THEN users.name ELSE EXCLUDED.name END
            "#,
        )
        .bind(email)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(self.get_user(email).await?.unwrap_or_else(|| UserLedger {
            email: email.to_string(),
            name: name.to_string(),
            ..Default::default()
        }))
    }

    async fn get_user(&self, email: &str) -> StudyHubResult<Option<UserLedger>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(name) = name else {
            return Ok(None);
        };

        Ok(Some(UserLedger {
            email: email.to_string(),
            name,
            favorites: self.mark_set(email, MarkKind::Favorite).await?,
            upvoted: self.mark_set(email, MarkKind::Upvote).await?,
            downvoted: self.mark_set(email, MarkKind::Downvote).await?,
        }))
    }

    async fn add_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        // The counter moves only if the insert produced a row.
        let sql = format!(
            r#"
            WITH ensured_user AS (
                INSERT INTO users (email) VALUES ($1)
                ON CONFLICT (email) DO NOTHING
            ),
            inserted AS (
                INSERT INTO {table} (user_email, resource_id)
                SELECT $1, $2
                WHERE EXISTS (SELECT 1 FROM resources WHERE id = $2)
                ON CONFLICT (user_email, resource_id) DO NOTHING
                RETURNING resource_id
            )
            UPDATE resources SET {counter} = {counter} + 1
            WHERE id IN (SELECT resource_id FROM inserted)
            RETURNING id
            "#,
            table = kind.table(),
            counter = kind.counter_column(),
        );

        let updated = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(email)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated.is_some())
    }

    async fn remove_mark(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        let sql = format!(
            r#"
            WITH deleted AS (
                DELETE FROM {table}
                WHERE user_email = $1 AND resource_id = $2
                RETURNING resource_id
            )
            UPDATE resources SET {counter} = GREATEST({counter} - 1, 0)
            WHERE id IN (SELECT resource_id FROM deleted)
            RETURNING id
            "#,
            table = kind.table(),
            counter = kind.counter_column(),
        );

        let updated = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(email)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated.is_some())
    }
}
