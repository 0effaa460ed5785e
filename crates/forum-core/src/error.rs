//! Error types for the forum core.
//!
//! [`StoreError`] is what every store backend reports. [`LoadError`] is the
//! cloneable form handed to every caller waiting on the same batch, and
//! [`FeedError`] is what the feed surfaces to the resolver layer.

use std::sync::Arc;

use forum_types::{PostId, UserId};

/// Boxed backend failure carried by [`StoreError::Backend`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by an entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The post a vote targets does not exist.
    #[error("post not found: {0}")]
    PostNotFound(PostId),

    /// A second vote row for the same user and post was rejected by the
    /// unique constraint.
    #[error("vote by user {user_id} on post {post_id} already exists")]
    DuplicateVote {
        /// The voting user.
        user_id: UserId,
        /// The post voted on.
        post_id: PostId,
    },

    /// The backend itself failed (connection loss, bad row, etc.).
    #[error("store backend error: {0}")]
    Backend(#[source] BoxError),
}

/// Failure delivered to every caller of a failed loader batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The batched fetch failed; all keys of the window share this error.
    #[error("batch fetch failed: {0}")]
    Fetch(Arc<StoreError>),

    /// The request driving the batch was dropped before it resolved.
    #[error("batch abandoned before it resolved")]
    Abandoned,
}

impl From<tokio::sync::watch::error::RecvError> for LoadError {
    fn from(_closed: tokio::sync::watch::error::RecvError) -> Self {
        Self::Abandoned
    }
}

/// Errors surfaced by feed operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The pagination cursor could not be decoded.
    #[error("invalid cursor {cursor:?}: {reason}")]
    InvalidCursor {
        /// The cursor as supplied by the caller.
        cursor: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A direct store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A loader-backed field failed to resolve.
    #[error(transparent)]
    Load(#[from] LoadError),
}
