//! Per-request state: the viewer and the request's two loaders.
//!
//! A [`RequestContext`] is built when a request arrives and dropped when it
//! ends. Its loaders cache only what this request fetched, so one viewer's
//! vote rows can never leak into another viewer's response.

use std::future::Future;

use forum_types::{PostId, User, UserId, Vote, VoteKey, VoteValue};

use crate::error::{LoadError, StoreError};
use crate::loader::{BatchFetch, BatchLoader};
use crate::store::{ReadStore, SessionStore};

/// Resolves post creators by user ID.
#[derive(Debug, Clone)]
pub struct CreatorFetch<S> {
    store: S,
}

impl<S: ReadStore> BatchFetch for CreatorFetch<S> {
    type Key = UserId;
    type Value = User;

    const NAME: &'static str = "creator";

    fn fetch(
        &self,
        keys: &[UserId],
    ) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send {
        self.store.users_by_ids(keys)
    }

    fn key_of(value: &User) -> UserId {
        value.id
    }
}

/// Resolves the viewer's vote rows by `(user, post)` key.
#[derive(Debug, Clone)]
pub struct VoteFetch<S> {
    store: S,
}

impl<S: ReadStore> BatchFetch for VoteFetch<S> {
    type Key = VoteKey;
    type Value = Vote;

    const NAME: &'static str = "vote_status";

    fn fetch(
        &self,
        keys: &[VoteKey],
    ) -> impl Future<Output = Result<Vec<Vote>, StoreError>> + Send {
        self.store.votes_by_keys(keys)
    }

    fn key_of(value: &Vote) -> VoteKey {
        value.key()
    }
}

/// Everything one request needs to resolve feed fields.
pub struct RequestContext<S: ReadStore> {
    viewer: Option<UserId>,
    creators: BatchLoader<CreatorFetch<S>>,
    votes: BatchLoader<VoteFetch<S>>,
}

impl<S: ReadStore + Clone> RequestContext<S> {
    /// Create a context for `viewer` with fresh, empty loaders.
    pub fn new(store: &S, viewer: Option<UserId>) -> Self {
        Self {
            viewer,
            creators: BatchLoader::new(CreatorFetch {
                store: store.clone(),
            }),
            votes: BatchLoader::new(VoteFetch {
                store: store.clone(),
            }),
        }
    }

    /// Create a context whose viewer is looked up from a session ID.
    ///
    /// A missing session ID or an unknown session yields an anonymous
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the session store cannot be read.
    pub async fn from_session<A: SessionStore>(
        store: &S,
        sessions: &A,
        session_id: Option<&str>,
    ) -> Result<Self, StoreError> {
        let viewer = match session_id {
            Some(id) => sessions.viewer(id).await?,
            None => None,
        };
        Ok(Self::new(store, viewer))
    }
}

impl<S: ReadStore> RequestContext<S> {
    /// The signed-in user, if any.
    pub const fn viewer(&self) -> Option<UserId> {
        self.viewer
    }

    /// Resolve a post's creator through the creator loader.
    pub fn creator(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<User>, LoadError>> + Send + '_ {
        self.creators.load(user_id)
    }

    /// Resolve the viewer's vote on a post through the vote loader.
    ///
    /// Anonymous viewers have no vote status and cause no store call.
    pub fn vote_status(
        &self,
        post_id: PostId,
    ) -> impl Future<Output = Result<Option<VoteValue>, LoadError>> + Send + '_ {
        let pending = self
            .viewer
            .map(|user_id| self.votes.load(VoteKey::new(user_id, post_id)));
        async move {
            match pending {
                Some(load) => Ok(load.await?.map(|vote| vote.value)),
                None => Ok(None),
            }
        }
    }
}
