//! Vote ledger: which resources each user upvoted, downvoted or favorited.
//!
//! Every mark pairs a set membership on the user with a denormalized counter
//! on the resource. Both halves change together or not at all, and only when
//! membership actually changes, so repeated calls are no-ops.
//!
//! Upvote and downvote are independent sets. Adding a downvote leaves an
//! existing upvote in place (and the reverse); callers that want mutual
//! exclusion must remove the other mark themselves.

use std::fmt;

use tracing::info;
use uuid::Uuid;

use studyhub_common::StudyHubResult;

use crate::store::ResourceStore;

/// One of the three per-user sets, each tied to a resource counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Upvote,
    Downvote,
    Favorite,
}

impl MarkKind {
    pub const ALL: [MarkKind; 3] = [MarkKind::Upvote, MarkKind::Downvote, MarkKind::Favorite];

    /// Table holding `(user_email, resource_id)` memberships.
    pub(crate) fn table(self) -> &'static str {
        match self {
            MarkKind::Upvote => "user_upvotes",
            MarkKind::Downvote => "user_downvotes",
            MarkKind::Favorite => "user_favorites",
        }
    }

    /// Counter column on `resources`.
    pub(crate) fn counter_column(self) -> &'static str {
        match self {
            MarkKind::Upvote => "upvotes_nr",
            MarkKind::Downvote => "downvotes_nr",
            MarkKind::Favorite => "favorites_nr",
        }
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkKind::Upvote => write!(f, "upvote"),
            MarkKind::Downvote => write!(f, "downvote"),
            MarkKind::Favorite => write!(f, "favorite"),
        }
    }
}

/// Named ledger operations over any store.
pub struct VoteLedger<S> {
    store: S,
}

impl<S: ResourceStore> VoteLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn add_upvote(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.add(email, resource_id, MarkKind::Upvote).await
    }

    pub async fn remove_upvote(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.remove(email, resource_id, MarkKind::Upvote).await
    }

    pub async fn add_downvote(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.add(email, resource_id, MarkKind::Downvote).await
    }

    pub async fn remove_downvote(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.remove(email, resource_id, MarkKind::Downvote).await
    }

    pub async fn add_favorite(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.add(email, resource_id, MarkKind::Favorite).await
    }

    pub async fn remove_favorite(&self, email: &str, resource_id: Uuid) -> StudyHubResult<bool> {
        self.remove(email, resource_id, MarkKind::Favorite).await
    }

    pub async fn add(&self, email: &str, resource_id: Uuid, kind: MarkKind) -> StudyHubResult<bool> {
        let changed = self.store.add_mark(email, resource_id, kind).await?;
        info!(%resource_id, %kind, changed, "Mark added");
        Ok(changed)
    }

    pub async fn remove(
        &self,
        email: &str,
        resource_id: Uuid,
        kind: MarkKind,
    ) -> StudyHubResult<bool> {
        let changed = self.store.remove_mark(email, resource_id, kind).await?;
        info!(%resource_id, %kind, changed, "Mark removed");
        Ok(changed)
    }
}
