//! Core entity structs for the forum.
//!
//! `Post` and `User` are rows owned by the CRUD layer; the vote ledger only
//! ever writes `Vote` rows and the `points` column of `Post`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::VoteValue;
use crate::ids::{PostId, UserId};

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A forum post.
///
/// `points` is the running sum of every vote cast on the post. It is only
/// ever adjusted incrementally by the vote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier, also the ordering tie-break for equal timestamps.
    pub id: PostId,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// The user who created the post.
    pub creator_id: UserId,
    /// Aggregate of all vote values on this post.
    pub points: i32,
    /// Creation time, the primary feed ordering key.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// The authenticated user creating the post.
    pub creator_id: UserId,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user as seen by the feed.
///
/// The password hash never leaves the credential layer, so it has no field
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique display name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// The composite identity of a vote: one user on one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct VoteKey {
    /// The voting user.
    pub user_id: UserId,
    /// The post voted on.
    pub post_id: PostId,
}

impl VoteKey {
    /// Build a key for `user_id` voting on `post_id`.
    pub const fn new(user_id: UserId, post_id: PostId) -> Self {
        Self { user_id, post_id }
    }
}

impl core::fmt::Display for VoteKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}|{}", self.user_id, self.post_id)
    }
}

/// A persisted vote row. At most one exists per [`VoteKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// The voting user.
    pub user_id: UserId,
    /// The post voted on.
    pub post_id: PostId,
    /// Normalized vote value.
    #[ts(type = "number")]
    pub value: VoteValue,
}

impl Vote {
    /// The composite key of this vote.
    pub const fn key(&self) -> VoteKey {
        VoteKey::new(self.user_id, self.post_id)
    }
}
