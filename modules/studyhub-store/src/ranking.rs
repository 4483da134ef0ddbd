//! Popularity scoring and the ranked order of resources.

use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use studyhub_common::{RankedResource, Resource, Weights};

/// Weighted linear score over a resource's engagement counters.
pub fn popularity(resource: &Resource, comment_count: i64, weights: &Weights) -> f64 {
    resource.upvotes_nr as f64 * weights.upvotes
        + resource.downvotes_nr as f64 * weights.downvotes
        + resource.favorites_nr as f64 * weights.favorites
        + resource.downloads_nr as f64 * weights.downloads
        + comment_count as f64 * weights.comments
}

/// Popularity descending, then newest first. The id keeps the order total so
/// page boundaries are stable.
pub fn rank_order(a: &RankedResource, b: &RankedResource) -> Ordering {
    b.popularity
        .total_cmp(&a.popularity)
        .then_with(|| b.resource.created_at.cmp(&a.resource.created_at))
        .then_with(|| a.resource.id.cmp(&b.resource.id))
}

/// Score and sort a full collection. Resources missing from `comment_counts`
/// have no comments.
pub fn rank<'a>(
    resources: impl IntoIterator<Item = &'a Resource>,
    comment_counts: &HashMap<Uuid, i64>,
    weights: &Weights,
) -> Vec<RankedResource> {
    let mut ranked: Vec<RankedResource> = resources
        .into_iter()
        .map(|r| {
            let comment_count = comment_counts.get(&r.id).copied().unwrap_or(0);
            RankedResource {
                resource: r.clone(),
                comment_count,
                popularity: popularity(r, comment_count, weights),
            }
        })
        .collect();
    ranked.sort_by(rank_order);
    ranked
}

/// SQL for the score. Binds `$1..$5` to the weights in declaration order and
/// expects `r` (resources) and `c` (per-resource comment counts) in scope.
pub(crate) const POPULARITY_SQL: &str = "( \
    r.upvotes_nr::float8 * $1 \
    + r.downvotes_nr::float8 * $2 \
    + r.favorites_nr::float8 * $3 \
    + r.downloads_nr::float8 * $4 \
    + COALESCE(c.comment_count, 0)::float8 * $5 )";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn resource(upvotes: i64, downvotes: i64, favorites: i64, downloads: i64) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            title: "Thermodynamics summary".into(),
            description: String::new(),
            document_type_id: Uuid::new_v4(),
            document_format: "pdf".into(),
            hashtags: String::new(),
            subject_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            user_email: "ana@example.com".into(),
            user_name: "Ana".into(),
            created_at: Utc::now(),
            favorites_nr: favorites,
            upvotes_nr: upvotes,
            downvotes_nr: downvotes,
            downloads_nr: downloads,
        }
    }

    #[test]
    fn weighted_score_matches_worked_example() {
        let weights = Weights {
            upvotes: 1.0,
            downvotes: -1.0,
            favorites: 2.0,
            downloads: 0.5,
            comments: 1.0,
        };
        let r = resource(3, 1, 2, 5);
        assert_eq!(popularity(&r, 0, &weights), 8.5);
    }

    #[test]
    fn comments_add_their_weight() {
        let weights = Weights::default();
        let r = resource(0, 0, 0, 0);
        assert_eq!(popularity(&r, 4, &weights), 4.0 * weights.comments);
    }

    #[test]
    fn more_upvotes_rank_first() {
        let a = resource(5, 1, 1, 1);
        let mut b = resource(4, 1, 1, 1);
        b.created_at = a.created_at + Duration::days(1);

        let ranked = rank([&b, &a], &HashMap::new(), &Weights::default());
        assert_eq!(ranked[0].resource.id, a.id);
        assert_eq!(ranked[1].resource.id, b.id);
    }

    #[test]
    fn equal_popularity_breaks_ties_newest_first() {
        let older = resource(2, 0, 0, 0);
        let mut newer = resource(2, 0, 0, 0);
        newer.created_at = older.created_at + Duration::minutes(5);

        let ranked = rank([&older, &newer], &HashMap::new(), &Weights::default());
        assert_eq!(ranked[0].resource.id, newer.id);
    }

    #[test]
    fn missing_comment_count_is_zero() {
        let r = resource(1, 0, 0, 0);
        let ranked = rank([&r], &HashMap::new(), &Weights::default());
        assert_eq!(ranked[0].comment_count, 0);
        assert_eq!(ranked[0].popularity, 1.0);
    }

    #[test]
    fn comments_can_outrank_votes() {
        let voted = resource(2, 0, 0, 0);
        let discussed = resource(0, 0, 0, 0);
        let counts = HashMap::from([(discussed.id, 3)]);

        let ranked = rank([&voted, &discussed], &counts, &Weights::default());
        assert_eq!(ranked[0].resource.id, discussed.id);
        assert_eq!(ranked[0].comment_count, 3);
    }
}
