//! Store seams between the core and its persistence backends.
//!
//! The core never talks to a database directly. It asks a [`ReadStore`] for
//! posts, users and votes, asks a [`LedgerStore`] for a transaction when it
//! mutates votes, and asks a [`SessionStore`] who the viewer is. `forum-db`
//! implements these for `PostgreSQL` and `Dragonfly`; [`crate::memory`]
//! implements them in-process.

use std::future::Future;

use forum_types::{Post, PostId, User, UserId, Vote, VoteKey, VoteValue};

use crate::error::StoreError;
use crate::pagination::Cursor;

/// Read access used by the feed and the batched loaders.
///
/// Batched reads accept any number of keys and may return rows in any
/// order; unmatched keys are simply missing from the result.
pub trait ReadStore: Send + Sync {
    /// Fetch up to `fetch` posts ordered by `(created_at, id)` descending,
    /// strictly below `boundary` when one is given.
    fn posts_before(
        &self,
        boundary: Option<Cursor>,
        fetch: usize,
    ) -> impl Future<Output = Result<Vec<Post>, StoreError>> + Send;

    /// Fetch a single post.
    fn post_by_id(
        &self,
        id: PostId,
    ) -> impl Future<Output = Result<Option<Post>, StoreError>> + Send;

    /// Fetch every user whose ID is in `ids`, in one round trip.
    fn users_by_ids(
        &self,
        ids: &[UserId],
    ) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send;

    /// Fetch every vote whose composite key is in `keys`, in one round trip.
    fn votes_by_keys(
        &self,
        keys: &[VoteKey],
    ) -> impl Future<Output = Result<Vec<Vote>, StoreError>> + Send;
}

/// Result of attempting to insert a vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written.
    Inserted,
    /// A row for the same key already exists (a concurrent writer won).
    Conflict,
}

/// Transactional write access used exclusively by the vote ledger.
pub trait LedgerStore: Send + Sync {
    /// The transaction handle type.
    type Tx: LedgerTx;

    /// Begin a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;
}

/// An open ledger transaction.
///
/// Nothing written through a transaction is visible to other readers until
/// [`commit`](LedgerTx::commit). Dropping the handle without committing
/// rolls every write back.
pub trait LedgerTx: Send {
    /// Lock the post row until the transaction ends. Returns `false` when
    /// the post does not exist.
    fn lock_post(
        &mut self,
        post_id: PostId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Read the current vote for `key`, if any.
    fn find_vote(
        &mut self,
        key: VoteKey,
    ) -> impl Future<Output = Result<Option<VoteValue>, StoreError>> + Send;

    /// Insert a new vote row. Reports [`InsertOutcome::Conflict`] instead of
    /// failing when the unique `(user_id, post_id)` constraint rejects it.
    fn insert_vote(
        &mut self,
        key: VoteKey,
        value: VoteValue,
    ) -> impl Future<Output = Result<InsertOutcome, StoreError>> + Send;

    /// Overwrite the value of an existing vote row.
    fn update_vote(
        &mut self,
        key: VoteKey,
        value: VoteValue,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically add `delta` to the post's points (`points = points + delta`).
    fn adjust_points(
        &mut self,
        post_id: PostId,
        delta: i32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Commit every write made through this transaction.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Read-only view of the session store kept by the auth collaborator.
pub trait SessionStore: Send + Sync {
    /// Resolve a session ID to the signed-in user, if the session exists
    /// and carries one.
    fn viewer(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<UserId>, StoreError>> + Send;
}
