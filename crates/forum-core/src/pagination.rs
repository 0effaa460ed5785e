//! Keyset pagination over the post feed.
//!
//! Pages are cut by filtering on the ordering key of the last item already
//! served instead of counting and skipping rows, so every page costs one
//! indexed range scan regardless of how deep the caller has scrolled.
//!
//! # Ordering and cursor format
//!
//! Posts are ordered by `(created_at DESC, id DESC)`. The `id` component
//! breaks ties between posts created in the same microsecond, so no post
//! is skipped or repeated across a page boundary. The cursor handed to
//! callers is `"<epoch-micros>:<post-uuid>"` and must be treated as opaque.
//!
//! ```text
//! fetch limit + 1 rows WHERE (created_at, id) < cursor
//!   rows == limit + 1  -> has_more, drop the extra row
//!   rows <= limit      -> last page
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use forum_types::{Post, PostId};

use crate::error::FeedError;
use crate::store::ReadStore;

/// Hard ceiling on the number of posts returned per page.
pub const MAX_PAGE_SIZE: usize = 50;

/// A decoded pagination boundary: the ordering key of the last post served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Creation time of the boundary post.
    pub created_at: DateTime<Utc>,
    /// ID of the boundary post, the tie-break for equal timestamps.
    pub id: PostId,
}

impl Cursor {
    /// The cursor that resumes the feed right after `post`.
    pub const fn after(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            id: post.id,
        }
    }

    /// Encode as the opaque token given to callers.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.created_at.timestamp_micros(), self.id)
    }

    /// Decode a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidCursor`] if the token is not a
    /// `micros:uuid` pair or the timestamp is out of range.
    pub fn decode(raw: &str) -> Result<Self, FeedError> {
        let invalid = |reason: String| FeedError::InvalidCursor {
            cursor: raw.to_owned(),
            reason,
        };

        let (micros, id) = raw
            .split_once(':')
            .ok_or_else(|| invalid("expected <micros>:<id>".to_owned()))?;
        let micros: i64 = micros
            .parse()
            .map_err(|e| invalid(format!("bad timestamp: {e}")))?;
        let created_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| invalid("timestamp out of range".to_owned()))?;
        let id: PostId = id.parse().map_err(|e| invalid(format!("bad post id: {e}")))?;

        Ok(Self { created_at, id })
    }

    /// Whether `post` sorts strictly after this boundary in feed order,
    /// i.e. belongs on a later page.
    pub fn admits(&self, post: &Post) -> bool {
        (post.created_at, post.id) < (self.created_at, self.id)
    }
}

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    /// Posts in feed order, at most the effective limit.
    pub items: Vec<Post>,
    /// Whether at least one more post exists past this page.
    pub has_more: bool,
    /// Token for the next page; `None` when the page is empty.
    pub next_cursor: Option<String>,
}

/// Clamp a caller-supplied page size into `1..=MAX_PAGE_SIZE`.
///
/// Negative and zero sizes become 1; oversized requests become
/// [`MAX_PAGE_SIZE`]. Nothing is rejected.
pub fn effective_limit(limit: i64) -> usize {
    usize::try_from(limit).map_or(1, |l| l.clamp(1, MAX_PAGE_SIZE))
}

/// Fetch one page of posts below `cursor`.
///
/// # Errors
///
/// Returns [`FeedError::InvalidCursor`] if `cursor` cannot be decoded and
/// [`FeedError::Store`] if the store query fails.
pub async fn paginate_posts<S: ReadStore>(
    store: &S,
    limit: i64,
    cursor: Option<&str>,
) -> Result<PostPage, FeedError> {
    let limit = effective_limit(limit);
    let boundary = cursor.map(Cursor::decode).transpose()?;

    let mut items = store.posts_before(boundary, limit.saturating_add(1)).await?;
    let has_more = items.len() > limit;
    items.truncate(limit);

    let next_cursor = items.last().map(|post| Cursor::after(post).encode());

    tracing::debug!(
        limit,
        returned = items.len(),
        has_more,
        "Paginated posts"
    );

    Ok(PostPage {
        items,
        has_more,
        next_cursor,
    })
}
