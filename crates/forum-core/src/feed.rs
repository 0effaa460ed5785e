//! Feed rendering: paginated posts with their loader-backed fields.
//!
//! [`Feed::page`] fetches one keyset page and then resolves every item's
//! creator and the viewer's vote status. All field futures are built before
//! any of them is awaited, so a page of N posts costs one posts query, one
//! users query and at most one votes query.

use std::future::Future;

use futures::future::join_all;
use serde::Serialize;

use forum_types::{Post, PostId, User, UserId, VoteValue};

use crate::config::FeedConfig;
use crate::context::RequestContext;
use crate::error::{FeedError, StoreError};
use crate::ledger::VoteLedger;
use crate::pagination::paginate_posts;
use crate::store::{LedgerStore, ReadStore};

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// A post together with the fields resolved for the current viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// The post row.
    #[serde(flatten)]
    pub post: Post,
    /// The post's creator, absent if the user row no longer exists.
    pub creator: Option<User>,
    /// The viewer's vote on this post; absent for anonymous viewers or when
    /// the viewer has not voted.
    pub vote_status: Option<VoteValue>,
}

/// One rendered page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    /// Rendered posts in feed order.
    pub items: Vec<FeedItem>,
    /// Whether another page follows.
    pub has_more: bool,
    /// Opaque token for the next page.
    pub next_cursor: Option<String>,
}

/// Entry point for feed reads and vote writes.
#[derive(Debug, Clone)]
pub struct Feed<S> {
    store: S,
    ledger: VoteLedger<S>,
    default_page_size: i64,
}

impl<S> Feed<S>
where
    S: ReadStore + LedgerStore + Clone,
{
    /// Create a feed over `store` with the default page size.
    pub fn new(store: S) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    /// Create a feed that serves `default_page_size` posts when the caller
    /// gives no limit. The value is still clamped to
    /// [`MAX_PAGE_SIZE`](crate::pagination::MAX_PAGE_SIZE).
    pub fn with_page_size(store: S, default_page_size: i64) -> Self {
        Self {
            ledger: VoteLedger::new(store.clone()),
            store,
            default_page_size,
        }
    }

    /// Create a feed from the `feed` section of `forum-config.yaml`.
    pub fn from_config(store: S, config: &FeedConfig) -> Self {
        Self::with_page_size(store, config.default_page_size)
    }

    /// The store behind this feed.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Cast the viewer's vote on a post. See [`VoteLedger::cast_vote`].
    pub async fn cast_vote(
        &self,
        viewer: Option<UserId>,
        post_id: PostId,
        raw_value: i32,
    ) -> Result<bool, StoreError> {
        self.ledger.cast_vote(viewer, post_id, raw_value).await
    }

    /// Render a single post, or `None` if it does not exist.
    pub async fn post(
        &self,
        ctx: &RequestContext<S>,
        post_id: PostId,
    ) -> Result<Option<FeedItem>, FeedError> {
        let Some(post) = self.store.post_by_id(post_id).await? else {
            return Ok(None);
        };
        Ok(Some(render(ctx, post).await?))
    }

    /// Render one page of the feed.
    ///
    /// `limit` falls back to the configured default and is clamped into
    /// `1..=`[`MAX_PAGE_SIZE`](crate::pagination::MAX_PAGE_SIZE).
    pub async fn page(
        &self,
        ctx: &RequestContext<S>,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let page = paginate_posts(
            &self.store,
            limit.unwrap_or(self.default_page_size),
            cursor,
        )
        .await?;

        let rendered = join_all(page.items.into_iter().map(|post| render(ctx, post))).await;
        let items = rendered.into_iter().collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            items = items.len(),
            has_more = page.has_more,
            viewer = ?ctx.viewer(),
            "Rendered feed page"
        );

        Ok(FeedPage {
            items,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        })
    }
}

/// Resolve a post's loader-backed fields.
///
/// Not an `async fn`: both loads must be registered when `render` is called,
/// not when it is first polled, so sibling renders share a batch window.
fn render<'a, S: ReadStore>(
    ctx: &'a RequestContext<S>,
    post: Post,
) -> impl Future<Output = Result<FeedItem, FeedError>> + Send + 'a {
    let creator = ctx.creator(post.creator_id);
    let vote_status = ctx.vote_status(post.id);
    async move {
        let (creator, vote_status) = futures::join!(creator, vote_status);
        Ok(FeedItem {
            post,
            creator: creator?,
            vote_status: vote_status?,
        })
    }
}

#[cfg(test)]
mod tests {
    use forum_types::NewPost;

    use super::*;
    use crate::config::ForumConfig;
    use crate::memory::MemoryStore;
    use crate::pagination::MAX_PAGE_SIZE;

    #[test]
    fn default_page_size_fits_under_the_ceiling() {
        assert!(usize::try_from(DEFAULT_PAGE_SIZE).is_ok_and(|size| size <= MAX_PAGE_SIZE));
    }

    #[tokio::test]
    async fn missing_post_renders_as_none() {
        let feed = Feed::new(MemoryStore::new());
        let ctx = RequestContext::new(feed.store(), None);
        let item = feed.post(&ctx, PostId::new()).await.ok();
        assert_eq!(item, Some(None));
    }

    #[tokio::test]
    async fn configured_page_size_applies_without_limit() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .create_post(NewPost {
                    title: format!("post {n}"),
                    content: "body".to_owned(),
                    creator_id: UserId::new(),
                })
                .await;
        }
        let config = ForumConfig::parse("feed:\n  default_page_size: 3\n")
            .ok()
            .unwrap_or_default();
        let feed = Feed::from_config(store, &config.feed);
        let ctx = RequestContext::new(feed.store(), None);

        let page = feed.page(&ctx, None, None).await.ok();
        assert_eq!(page.as_ref().map(|p| p.items.len()), Some(3));
        assert_eq!(page.as_ref().map(|p| p.has_more), Some(true));

        let page = feed.page(&ctx, Some(10), None).await.ok();
        assert_eq!(page.as_ref().map(|p| p.items.len()), Some(5));
    }

    #[tokio::test]
    async fn unknown_creator_renders_as_absent() {
        let store = MemoryStore::new();
        let post = store
            .create_post(NewPost {
                title: "orphan".to_owned(),
                content: "body".to_owned(),
                creator_id: UserId::new(),
            })
            .await;
        let feed = Feed::new(store);
        let ctx = RequestContext::new(feed.store(), None);

        let item = feed.post(&ctx, post.id).await.ok().flatten();
        assert_eq!(item.as_ref().map(|i| i.post.id), Some(post.id));
        assert_eq!(item.and_then(|i| i.creator), None);
    }
}
