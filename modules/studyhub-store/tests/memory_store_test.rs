//! Behaviour tests for the in-memory store and the vote ledger.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use studyhub_common::{NewResource, Page, Resource, ResourcePatch, Weights};
use studyhub_store::{MemoryStore, ResourceStore, SearchQuery, VoteLedger};
use uuid::Uuid;

struct Refs {
    course_id: Uuid,
    subject_id: Uuid,
    document_type_id: Uuid,
}

async fn seed_refs(store: &MemoryStore) -> Refs {
    let course = store.create_course("Computer Science").await.unwrap();
    let subject = store
        .create_subject(course.id, "Operating Systems")
        .await
        .unwrap();
    let document_type = store.create_document_type("Exam").await.unwrap();
    Refs {
        course_id: course.id,
        subject_id: subject.id,
        document_type_id: document_type.id,
    }
}

fn new_resource(refs: &Refs, title: &str, owner: &str) -> NewResource {
    NewResource {
        title: title.to_string(),
        description: "Past paper with solutions".to_string(),
        document_type_id: refs.document_type_id,
        document_format: "pdf".to_string(),
        hashtags: "#exam".to_string(),
        subject_id: refs.subject_id,
        course_id: refs.course_id,
        user_email: owner.to_string(),
        user_name: "Rita".to_string(),
    }
}

fn resource_at(refs: &Refs, title: &str, minutes_ago: i64) -> Resource {
    Resource {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: String::new(),
        document_type_id: refs.document_type_id,
        document_format: "pdf".to_string(),
        hashtags: String::new(),
        subject_id: refs.subject_id,
        course_id: refs.course_id,
        user_email: "rita@example.com".to_string(),
        user_name: "Rita".to_string(),
        created_at: Utc::now() - Duration::minutes(minutes_ago),
        favorites_nr: 0,
        upvotes_nr: 0,
        downvotes_nr: 0,
        downloads_nr: 0,
    }
}

// =========================================================================
// Store basics
// =========================================================================

#[tokio::test]
async fn get_missing_resource_is_none() {
    let store = MemoryStore::new();
    assert!(store.get_resource(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_assigns_id_and_zero_counters() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;

    let a = store
        .create_resource(new_resource(&refs, "OS exam 2023", "rita@example.com"))
        .await
        .unwrap();
    let b = store
        .create_resource(new_resource(&refs, "OS exam 2022", "rita@example.com"))
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(
        (a.favorites_nr, a.upvotes_nr, a.downvotes_nr, a.downloads_nr),
        (0, 0, 0, 0)
    );
    assert_eq!(store.get_resource(a.id).await.unwrap(), Some(a));
}

#[tokio::test]
async fn update_merges_and_missing_id_returns_none() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let created = store
        .create_resource(new_resource(&refs, "Scheduling notes", "rita@example.com"))
        .await
        .unwrap();

    let patch = ResourcePatch {
        hashtags: Some("#scheduling #rr".into()),
        ..Default::default()
    };
    let updated = store
        .update_resource(created.id, patch.clone())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.hashtags, "#scheduling #rr");
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.created_at, created.created_at);

    assert!(store
        .update_resource(Uuid::new_v4(), patch)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn concurrent_downloads_are_not_lost() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let created = store
        .create_resource(new_resource(&refs, "Paging slides", "rita@example.com"))
        .await
        .unwrap();

    let id = created.id;
    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.increment_downloads(id).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let stored = store.get_resource(created.id).await.unwrap().unwrap();
    assert_eq!(stored.downloads_nr, 50);
    assert!(!store.increment_downloads(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn listings_filter_and_count() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let mine = store
        .create_resource(new_resource(&refs, "Mine", "rita@example.com"))
        .await
        .unwrap();
    let theirs = store
        .create_resource(new_resource(&refs, "Theirs", "tiago@example.com"))
        .await
        .unwrap();
    let page = Page::new(0, 10);

    let owned = store
        .list_resources_by_owner("tiago@example.com", page)
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, theirs.id);
    assert_eq!(
        store
            .count_resources_by_owner("rita@example.com")
            .await
            .unwrap(),
        1
    );

    let ids = [mine.id, Uuid::new_v4()];
    let by_ids = store.list_resources_by_ids(&ids, page).await.unwrap();
    assert_eq!(by_ids.len(), 1);
    assert_eq!(by_ids[0].id, mine.id);
    assert_eq!(store.count_resources_by_ids(&ids).await.unwrap(), 1);
    assert_eq!(store.count_resources().await.unwrap(), 2);
}

#[tokio::test]
async fn list_all_is_newest_first() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let old = resource_at(&refs, "old", 60);
    let new = resource_at(&refs, "new", 1);
    store.insert_resource(old.clone()).await;
    store.insert_resource(new.clone()).await;

    let listed = store.list_resources(Page::new(0, 10)).await.unwrap();
    assert_eq!(listed[0].id, new.id);
    assert_eq!(listed[1].id, old.id);
}

#[tokio::test]
async fn pages_cover_the_collection_exactly_once() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    for i in 0..23 {
        store
            .insert_resource(resource_at(&refs, &format!("doc {i}"), (i / 3) as i64))
            .await;
    }

    let mut seen = Vec::new();
    for number in 0.. {
        let page = store.list_resources(Page::new(number, 5)).await.unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 5);
        seen.extend(page.into_iter().map(|r| r.id));
    }

    let unique: HashSet<Uuid> = seen.iter().copied().collect();
    assert_eq!(seen.len(), 23);
    assert_eq!(unique.len(), 23);
}

// =========================================================================
// Ranking
// =========================================================================

#[tokio::test]
async fn popular_orders_by_score_then_newest() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;

    let mut top = resource_at(&refs, "top", 30);
    top.upvotes_nr = 10;
    let mut tied_old = resource_at(&refs, "tied old", 20);
    tied_old.upvotes_nr = 3;
    let mut tied_new = resource_at(&refs, "tied new", 10);
    tied_new.upvotes_nr = 3;
    let quiet = resource_at(&refs, "quiet", 0);

    for r in [&top, &tied_old, &tied_new, &quiet] {
        store.insert_resource(r.clone()).await;
    }

    let ranked = store
        .list_popular(Page::new(0, 10), &Weights::default())
        .await
        .unwrap();
    let order: Vec<Uuid> = ranked.iter().map(|r| r.resource.id).collect();
    assert_eq!(order, vec![top.id, tied_new.id, tied_old.id, quiet.id]);
}

#[tokio::test]
async fn popular_counts_comments() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let plain = resource_at(&refs, "plain", 0);
    let discussed = resource_at(&refs, "discussed", 60);
    store.insert_resource(plain.clone()).await;
    store.insert_resource(discussed.clone()).await;
    store
        .add_comment(discussed.id, "rita@example.com", "Question 3 is wrong")
        .await
        .unwrap();

    let ranked = store
        .list_popular(Page::new(0, 10), &Weights::default())
        .await
        .unwrap();
    assert_eq!(ranked[0].resource.id, discussed.id);
    assert_eq!(ranked[0].comment_count, 1);
    assert_eq!(ranked[1].comment_count, 0);
    assert_eq!(store.count_comments(discussed.id).await.unwrap(), 1);
    assert_eq!(store.list_comments(discussed.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn popular_paginates() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    for i in 0..5 {
        let mut r = resource_at(&refs, &format!("r{i}"), 0);
        r.upvotes_nr = i;
        store.insert_resource(r).await;
    }

    let second = store
        .list_popular(Page::new(1, 2), &Weights::default())
        .await
        .unwrap();
    let upvotes: Vec<i64> = second.iter().map(|r| r.resource.upvotes_nr).collect();
    assert_eq!(upvotes, vec![2, 1]);
}

// =========================================================================
// Search
// =========================================================================

#[tokio::test]
async fn search_matches_joined_fields() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let created = store
        .create_resource(new_resource(&refs, "Deadlock examples", "rita@example.com"))
        .await
        .unwrap();

    // Subject name, course name and document type name come from the join.
    for q in ["operating", "COMPUTER science", "exam", "deadlock"] {
        let hits = store
            .search(&SearchQuery::new(q), Page::new(0, 10))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1, "query {q}");
        assert_eq!(hits[0].id, created.id);
        assert_eq!(hits[0].subject.name, "Operating Systems");
        assert_eq!(hits[0].course.name, "Computer Science");
        assert_eq!(hits[0].document_type.name, "Exam");
    }

    let misses = store
        .search(&SearchQuery::new("biology"), Page::new(0, 10))
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn search_excludes_unresolved_subject() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    let mut orphan = new_resource(&refs, "Deadlock orphan", "rita@example.com");
    orphan.subject_id = Uuid::new_v4();
    store.create_resource(orphan).await.unwrap();
    let linked = store
        .create_resource(new_resource(&refs, "Deadlock linked", "rita@example.com"))
        .await
        .unwrap();

    let query = SearchQuery::new("deadlock");
    let hits = store.search(&query, Page::new(0, 10)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, linked.id);
    assert_eq!(store.count_search(&query).await.unwrap(), 1);
}

#[tokio::test]
async fn count_search_ignores_pagination() {
    let store = MemoryStore::new();
    let refs = seed_refs(&store).await;
    for i in 0..7 {
        store
            .create_resource(new_resource(&refs, &format!("Threads {i}"), "rita@example.com"))
            .await
            .unwrap();
    }

    let query = SearchQuery::new("threads");
    let page = store.search(&query, Page::new(1, 5)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(store.count_search(&query).await.unwrap(), 7);
}

// =========================================================================
// Vote ledger
// =========================================================================

#[tokio::test]
async fn add_upvote_twice_counts_once() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let r = store
        .create_resource(new_resource(&refs, "Semaphores", "rita@example.com"))
        .await
        .unwrap();
    let ledger = VoteLedger::new(store.clone());

    assert!(ledger.add_upvote("tiago@example.com", r.id).await.unwrap());
    assert!(!ledger.add_upvote("tiago@example.com", r.id).await.unwrap());

    let stored = store.get_resource(r.id).await.unwrap().unwrap();
    assert_eq!(stored.upvotes_nr, 1);
    let user = store.get_user("tiago@example.com").await.unwrap().unwrap();
    assert_eq!(user.upvoted, vec![r.id]);
}

#[tokio::test]
async fn upvote_then_remove_restores_state() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let mut seeded = resource_at(&refs, "Mutexes", 0);
    seeded.upvotes_nr = 4;
    store.insert_resource(seeded.clone()).await;
    let ledger = VoteLedger::new(store.clone());

    ledger.add_upvote("tiago@example.com", seeded.id).await.unwrap();
    assert!(ledger
        .remove_upvote("tiago@example.com", seeded.id)
        .await
        .unwrap());
    assert!(!ledger
        .remove_upvote("tiago@example.com", seeded.id)
        .await
        .unwrap());

    let stored = store.get_resource(seeded.id).await.unwrap().unwrap();
    assert_eq!(stored.upvotes_nr, 4);
    let user = store.get_user("tiago@example.com").await.unwrap().unwrap();
    assert!(user.upvoted.is_empty());
}

#[tokio::test]
async fn downvote_does_not_clear_upvote() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let r = store
        .create_resource(new_resource(&refs, "Pipes", "rita@example.com"))
        .await
        .unwrap();
    let ledger = VoteLedger::new(store.clone());

    ledger.add_upvote("tiago@example.com", r.id).await.unwrap();
    ledger.add_downvote("tiago@example.com", r.id).await.unwrap();

    let stored = store.get_resource(r.id).await.unwrap().unwrap();
    assert_eq!(stored.upvotes_nr, 1);
    assert_eq!(stored.downvotes_nr, 1);
    let user = store.get_user("tiago@example.com").await.unwrap().unwrap();
    assert_eq!(user.upvoted, vec![r.id]);
    assert_eq!(user.downvoted, vec![r.id]);
}

#[tokio::test]
async fn concurrent_duplicate_upvotes_count_once() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let r = store
        .create_resource(new_resource(&refs, "Signals", "rita@example.com"))
        .await
        .unwrap();

    let id = r.id;
    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = VoteLedger::new(store.clone());
        handles.push(tokio::spawn(async move {
            ledger.add_upvote("tiago@example.com", id).await.unwrap()
        }));
    }
    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    let stored = store.get_resource(r.id).await.unwrap().unwrap();
    assert_eq!(stored.upvotes_nr, 1);
}

#[tokio::test]
async fn favorites_track_counter() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let r = store
        .create_resource(new_resource(&refs, "Memory maps", "rita@example.com"))
        .await
        .unwrap();
    let ledger = VoteLedger::new(store.clone());

    ledger.add_favorite("ana@example.com", r.id).await.unwrap();
    ledger.add_favorite("tiago@example.com", r.id).await.unwrap();
    ledger.remove_favorite("ana@example.com", r.id).await.unwrap();

    let stored = store.get_resource(r.id).await.unwrap().unwrap();
    assert_eq!(stored.favorites_nr, 1);
}

#[tokio::test]
async fn marking_missing_resource_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let ledger = VoteLedger::new(store.clone());

    assert!(!ledger
        .add_upvote("tiago@example.com", Uuid::new_v4())
        .await
        .unwrap());
    assert!(store.get_user("tiago@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn ensure_user_creates_empty_ledger_once() {
    let store = Arc::new(MemoryStore::new());
    let refs = seed_refs(&store).await;
    let r = store
        .create_resource(new_resource(&refs, "Filesystems", "rita@example.com"))
        .await
        .unwrap();

    let first = store.ensure_user("ana@example.com", "Ana").await.unwrap();
    assert!(first.favorites.is_empty());

    VoteLedger::new(store.clone())
        .add_favorite("ana@example.com", r.id)
        .await
        .unwrap();

    let again = store.ensure_user("ana@example.com", "").await.unwrap();
    assert_eq!(again.name, "Ana");
    assert_eq!(again.favorites, vec![r.id]);
}
