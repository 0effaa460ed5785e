//! In-process implementation of every store seam.
//!
//! [`MemoryStore`] keeps posts, users, votes and sessions behind a single
//! [`tokio::sync::Mutex`]. A ledger transaction owns that lock for its whole
//! lifetime, so no reader can observe a vote row without its matching points
//! adjustment. Writes are applied in place and journaled; dropping a
//! [`MemoryTx`] without committing replays the journal backwards.
//!
//! Timestamps are truncated to microseconds on insert to match the
//! precision of `PostgreSQL` `TIMESTAMPTZ`, so cursors behave identically on
//! both backends.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{SubsecRound, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use forum_types::{NewPost, Post, PostId, User, UserId, Vote, VoteKey, VoteValue};

use crate::error::StoreError;
use crate::pagination::Cursor;
use crate::store::{InsertOutcome, LedgerStore, LedgerTx, ReadStore, SessionStore};

/// Row storage guarded by the store mutex.
#[derive(Debug, Default)]
struct Tables {
    posts: BTreeMap<PostId, Post>,
    users: BTreeMap<UserId, User>,
    votes: BTreeMap<VoteKey, VoteValue>,
    sessions: HashMap<String, UserId>,
}

/// Counters for batched reads, used to assert that rendering a page does
/// not issue one query per row.
#[derive(Debug, Default)]
struct QueryCounters {
    users_by_ids: AtomicUsize,
    votes_by_keys: AtomicUsize,
    posts_before: AtomicUsize,
}

/// Snapshot of [`MemoryStore`] query counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStats {
    /// Calls to [`ReadStore::users_by_ids`].
    pub users_by_ids: usize,
    /// Calls to [`ReadStore::votes_by_keys`].
    pub votes_by_keys: usize,
    /// Calls to [`ReadStore::posts_before`].
    pub posts_before: usize,
}

/// A cheaply cloneable in-memory forum store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    counters: Arc<QueryCounters>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed post, keeping its ID and timestamps.
    pub async fn insert_post(&self, mut post: Post) {
        post.created_at = post.created_at.trunc_subsecs(6);
        post.updated_at = post.updated_at.trunc_subsecs(6);
        self.tables.lock().await.posts.insert(post.id, post);
    }

    /// Create a post from user input, assigning ID and timestamps.
    pub async fn create_post(&self, input: NewPost) -> Post {
        let now = Utc::now().trunc_subsecs(6);
        let post = Post {
            id: PostId::new(),
            title: input.title,
            content: input.content,
            creator_id: input.creator_id,
            points: 0,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.posts.insert(post.id, post.clone());
        post
    }

    /// Insert a user row.
    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    /// Attach a signed-in user to a session ID.
    pub async fn insert_session(&self, session_id: &str, user_id: UserId) {
        self.tables
            .lock()
            .await
            .sessions
            .insert(session_id.to_owned(), user_id);
    }

    /// Copy out every post and vote, for invariant checks.
    pub async fn snapshot(&self) -> (Vec<Post>, Vec<Vote>) {
        let tables = self.tables.lock().await;
        let posts = tables.posts.values().cloned().collect();
        let votes = tables
            .votes
            .iter()
            .map(|(key, value)| Vote {
                user_id: key.user_id,
                post_id: key.post_id,
                value: *value,
            })
            .collect();
        (posts, votes)
    }

    /// Current query counters.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            users_by_ids: self.counters.users_by_ids.load(Ordering::Relaxed),
            votes_by_keys: self.counters.votes_by_keys.load(Ordering::Relaxed),
            posts_before: self.counters.posts_before.load(Ordering::Relaxed),
        }
    }
}

impl ReadStore for MemoryStore {
    async fn posts_before(
        &self,
        boundary: Option<Cursor>,
        fetch: usize,
    ) -> Result<Vec<Post>, StoreError> {
        self.counters.posts_before.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.lock().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| boundary.is_none_or(|cursor| cursor.admits(post)))
            .cloned()
            .collect();
        posts.sort_unstable_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts.truncate(fetch);
        Ok(posts)
    }

    async fn post_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        Ok(self.tables.lock().await.posts.get(&id).cloned())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        self.counters.users_by_ids.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn votes_by_keys(&self, keys: &[VoteKey]) -> Result<Vec<Vote>, StoreError> {
        self.counters.votes_by_keys.fetch_add(1, Ordering::Relaxed);
        let tables = self.tables.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| {
                tables.votes.get(key).map(|value| Vote {
                    user_id: key.user_id,
                    post_id: key.post_id,
                    value: *value,
                })
            })
            .collect())
    }
}

impl SessionStore for MemoryStore {
    async fn viewer(&self, session_id: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.tables.lock().await.sessions.get(session_id).copied())
    }
}

impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            tables: Arc::clone(&self.tables).lock_owned().await,
            journal: Vec::new(),
        })
    }
}

/// A write recorded so it can be reverted on rollback.
#[derive(Debug)]
enum Undo {
    RemoveVote(VoteKey),
    RestoreVote(VoteKey, VoteValue),
    Points(PostId, i32),
}

/// Exclusive transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    tables: OwnedMutexGuard<Tables>,
    journal: Vec<Undo>,
}

impl LedgerTx for MemoryTx {
    async fn lock_post(&mut self, post_id: PostId) -> Result<bool, StoreError> {
        Ok(self.tables.posts.contains_key(&post_id))
    }

    async fn find_vote(&mut self, key: VoteKey) -> Result<Option<VoteValue>, StoreError> {
        Ok(self.tables.votes.get(&key).copied())
    }

    async fn insert_vote(
        &mut self,
        key: VoteKey,
        value: VoteValue,
    ) -> Result<InsertOutcome, StoreError> {
        if self.tables.votes.contains_key(&key) {
            return Ok(InsertOutcome::Conflict);
        }
        self.tables.votes.insert(key, value);
        self.journal.push(Undo::RemoveVote(key));
        Ok(InsertOutcome::Inserted)
    }

    async fn update_vote(&mut self, key: VoteKey, value: VoteValue) -> Result<(), StoreError> {
        let previous = self.tables.votes.insert(key, value);
        self.journal.push(previous.map_or(Undo::RemoveVote(key), |old| {
            Undo::RestoreVote(key, old)
        }));
        Ok(())
    }

    async fn adjust_points(&mut self, post_id: PostId, delta: i32) -> Result<(), StoreError> {
        let post = self
            .tables
            .posts
            .get_mut(&post_id)
            .ok_or(StoreError::PostNotFound(post_id))?;
        post.points = post.points.saturating_add(delta);
        self.journal.push(Undo::Points(post_id, delta));
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.journal.clear();
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::RemoveVote(key) => {
                    self.tables.votes.remove(&key);
                }
                Undo::RestoreVote(key, value) => {
                    self.tables.votes.insert(key, value);
                }
                Undo::Points(post_id, delta) => {
                    if let Some(post) = self.tables.posts.get_mut(&post_id) {
                        post.points = post.points.saturating_sub(delta);
                    }
                }
            }
        }
    }
}
