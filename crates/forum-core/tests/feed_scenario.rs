//! End-to-end feed scenarios against the in-memory store.
//!
//! Covers the voting walkthrough, N+1 freedom of page rendering, and the
//! anonymous and session-derived viewer paths.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::too_many_lines
)]

use chrono::{DateTime, TimeZone, Utc};
use forum_core::{AuditResult, Feed, MemoryStore, RequestContext, verify_points};
use forum_types::{Post, PostId, User, UserId, VoteValue};

fn at_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
}

async fn seed_user(store: &MemoryStore, name: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: UserId::new(),
        username: name.to_owned(),
        email: format!("{name}@example.com"),
        created_at: now,
        updated_at: now,
    };
    store.insert_user(user.clone()).await;
    user
}

async fn seed_post(store: &MemoryStore, title: &str, creator: &User, ms: i64) -> Post {
    let created_at = at_millis(ms);
    let post = Post {
        id: PostId::new(),
        title: title.to_owned(),
        content: format!("{title} body"),
        creator_id: creator.id,
        points: 0,
        created_at,
        updated_at: created_at,
    };
    store.insert_post(post.clone()).await;
    post
}

#[tokio::test]
async fn vote_walkthrough_keeps_points_consistent() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    let voter = seed_user(&store, "voter").await;
    let a = seed_post(&store, "A", &author, 100).await;
    let b = seed_post(&store, "B", &author, 90).await;
    let feed = Feed::new(store.clone());

    assert!(feed.cast_vote(Some(voter.id), a.id, 1).await.unwrap());
    let ctx = RequestContext::new(feed.store(), Some(voter.id));
    let item = feed.post(&ctx, a.id).await.unwrap().unwrap();
    assert_eq!(item.post.points, 1);
    assert_eq!(item.vote_status, Some(VoteValue::Up));

    assert!(feed.cast_vote(Some(voter.id), a.id, -1).await.unwrap());
    let (posts, votes) = store.snapshot().await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].value, VoteValue::Down);
    assert_eq!(verify_points(&posts, &votes), AuditResult::Balanced);

    let ctx = RequestContext::new(feed.store(), Some(voter.id));
    let page = feed.page(&ctx, Some(10), None).await.unwrap();
    let ids: Vec<PostId> = page.items.iter().map(|i| i.post.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert!(!page.has_more);
    assert_eq!(page.items[0].post.points, -1);
    assert_eq!(page.items[0].vote_status, Some(VoteValue::Down));
    assert_eq!(page.items[1].vote_status, None);
    assert_eq!(page.items[0].creator.as_ref().map(|u| u.id), Some(author.id));
}

#[tokio::test]
async fn anonymous_vote_is_refused() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    let post = seed_post(&store, "A", &author, 100).await;
    let feed = Feed::new(store.clone());

    assert!(!feed.cast_vote(None, post.id, 1).await.unwrap());
    let (_, votes) = store.snapshot().await;
    assert!(votes.is_empty());
}

#[tokio::test]
async fn page_rendering_issues_one_query_per_loader() {
    let store = MemoryStore::new();
    let authors = [
        seed_user(&store, "ada").await,
        seed_user(&store, "grace").await,
        seed_user(&store, "linus").await,
    ];
    let viewer = seed_user(&store, "viewer").await;
    let mut posts = Vec::new();
    for n in 0..30 {
        let author = &authors[n % authors.len()];
        let ms = 10_000 - i64::try_from(n).unwrap() * 10;
        posts.push(seed_post(&store, &format!("post {n}"), author, ms).await);
    }

    let feed = Feed::new(store.clone());
    for post in posts.iter().step_by(4) {
        assert!(feed.cast_vote(Some(viewer.id), post.id, 1).await.unwrap());
    }

    let before = store.stats();
    let ctx = RequestContext::new(feed.store(), Some(viewer.id));
    let page = feed.page(&ctx, Some(25), None).await.unwrap();
    let after = store.stats();

    assert_eq!(page.items.len(), 25);
    assert!(page.has_more);
    assert_eq!(after.posts_before - before.posts_before, 1);
    assert_eq!(after.users_by_ids - before.users_by_ids, 1);
    assert_eq!(after.votes_by_keys - before.votes_by_keys, 1);

    for (n, item) in page.items.iter().enumerate() {
        let expected = (n % 4 == 0).then_some(VoteValue::Up);
        assert_eq!(item.vote_status, expected, "post {n}");
        assert_eq!(item.creator.as_ref().map(|u| u.id), Some(item.post.creator_id));
    }
}

#[tokio::test]
async fn anonymous_page_never_queries_votes() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    for n in 0..5 {
        seed_post(&store, &format!("post {n}"), &author, 1_000 - n * 10).await;
    }

    let feed = Feed::new(store.clone());
    let ctx = RequestContext::new(feed.store(), None);
    let page = feed.page(&ctx, None, None).await.unwrap();

    assert_eq!(page.items.len(), 5);
    assert!(page.items.iter().all(|item| item.vote_status.is_none()));
    assert_eq!(store.stats().votes_by_keys, 0);
    assert_eq!(store.stats().users_by_ids, 1);
}

#[tokio::test]
async fn paging_through_the_whole_feed_with_cursors() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    let mut expected = Vec::new();
    for n in 0..51 {
        expected.push(seed_post(&store, &format!("post {n}"), &author, 100_000 - n * 10).await.id);
    }

    let feed = Feed::new(store);
    let ctx = RequestContext::new(feed.store(), None);

    let first = feed.page(&ctx, Some(50), None).await.unwrap();
    assert_eq!(first.items.len(), 50);
    assert!(first.has_more);

    let second = feed
        .page(&ctx, Some(50), first.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(!second.has_more);

    let seen: Vec<PostId> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|item| item.post.id)
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn session_viewer_sees_their_own_votes() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    let viewer = seed_user(&store, "viewer").await;
    let post = seed_post(&store, "A", &author, 100).await;
    store.insert_session("sess-abc", viewer.id).await;

    let feed = Feed::new(store.clone());
    assert!(feed.cast_vote(Some(viewer.id), post.id, -1).await.unwrap());

    let ctx = RequestContext::from_session(feed.store(), &store, Some("sess-abc"))
        .await
        .unwrap();
    assert_eq!(ctx.viewer(), Some(viewer.id));
    let item = feed.post(&ctx, post.id).await.unwrap().unwrap();
    assert_eq!(item.vote_status, Some(VoteValue::Down));
}

#[tokio::test]
async fn feed_item_serializes_flat_with_camel_case_fields() {
    let store = MemoryStore::new();
    let author = seed_user(&store, "author").await;
    let post = seed_post(&store, "A", &author, 100).await;
    let feed = Feed::new(store);
    let ctx = RequestContext::new(feed.store(), None);

    let item = feed.post(&ctx, post.id).await.unwrap().unwrap();
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["id"], serde_json::json!(post.id.to_string()));
    assert_eq!(json["points"], serde_json::json!(0));
    assert!(json["voteStatus"].is_null());
    assert_eq!(json["creator"]["username"], serde_json::json!("author"));
}
