//! The vote ledger: the only writer of vote rows and of `Post::points`.
//!
//! Every cast goes through one transaction that locks the post row, reads
//! the caller's existing vote, plans a [`VoteTransition`] and applies the
//! vote write together with an atomic `points = points + delta` update.
//!
//! # Transitions
//!
//! | Existing | Cast | Row write | Points delta |
//! |----------|------|-----------|--------------|
//! | none | v | insert v | v |
//! | v | v | none | 0 |
//! | -v | v | update to v | 2v |
//!
//! Because every transition moves `points` by exactly the change in the
//! summed vote values, `points == sum(votes)` holds after every commit.
//!
//! # Races
//!
//! The post row lock serializes casts on the same post. If a backend still
//! reports an insert conflict (another writer created the row first), the
//! ledger re-reads the winner's row inside the same transaction and
//! re-plans against it, so the cast resolves as a flip or a no-op.

use forum_types::{PostId, UserId, VoteKey, VoteValue};

use crate::error::StoreError;
use crate::store::{InsertOutcome, LedgerStore, LedgerTx};

/// The effect a cast has on the ledger, given the existing vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote: insert a new row.
    Cast(VoteValue),
    /// The same value was already cast: nothing to do.
    Unchanged,
    /// The opposite value was cast: overwrite it in place.
    Flip(VoteValue),
}

impl VoteTransition {
    /// Plan the transition from `existing` to `value`.
    pub fn plan(existing: Option<VoteValue>, value: VoteValue) -> Self {
        match existing {
            None => Self::Cast(value),
            Some(current) if current == value => Self::Unchanged,
            Some(_) => Self::Flip(value),
        }
    }

    /// The change this transition makes to the post's points.
    pub const fn points_delta(self) -> i32 {
        match self {
            Self::Cast(value) => value.as_i32(),
            Self::Unchanged => 0,
            Self::Flip(value) => value.as_i32().saturating_mul(2),
        }
    }
}

/// Applies votes transactionally against a [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct VoteLedger<S> {
    store: S,
}

impl<S: LedgerStore> VoteLedger<S> {
    /// Create a ledger over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Cast `raw_value` as the viewer's vote on `post_id`.
    ///
    /// `raw_value` is normalized: `-1` is a downvote, anything else an
    /// upvote. Returns `Ok(false)` without touching the store when there is
    /// no signed-in viewer, and `Ok(true)` once the vote is applied
    /// (including when it repeats the viewer's existing vote).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PostNotFound`] if the post does not exist and
    /// propagates any other store failure. Nothing is written on error.
    pub async fn cast_vote(
        &self,
        viewer: Option<UserId>,
        post_id: PostId,
        raw_value: i32,
    ) -> Result<bool, StoreError> {
        let Some(user_id) = viewer else {
            tracing::debug!(%post_id, "Vote rejected: no signed-in user");
            return Ok(false);
        };

        let value = VoteValue::normalize(raw_value);
        let key = VoteKey::new(user_id, post_id);

        let mut tx = self.store.begin().await?;
        if !tx.lock_post(post_id).await? {
            return Err(StoreError::PostNotFound(post_id));
        }

        let transition = apply_transition(&mut tx, key, value).await?;
        tx.commit().await?;

        tracing::debug!(
            %user_id,
            %post_id,
            ?transition,
            delta = transition.points_delta(),
            "Vote applied"
        );
        Ok(true)
    }

    /// Return a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

/// Plan and write one transition inside an open transaction.
async fn apply_transition<T: LedgerTx>(
    tx: &mut T,
    key: VoteKey,
    value: VoteValue,
) -> Result<VoteTransition, StoreError> {
    let mut transition = VoteTransition::plan(tx.find_vote(key).await?, value);

    match transition {
        VoteTransition::Cast(_) => {
            if tx.insert_vote(key, value).await? == InsertOutcome::Conflict {
                let winner = tx.find_vote(key).await?.ok_or(StoreError::DuplicateVote {
                    user_id: key.user_id,
                    post_id: key.post_id,
                })?;
                tracing::warn!(
                    user_id = %key.user_id,
                    post_id = %key.post_id,
                    "Concurrent vote insert lost the race, re-planning against existing row"
                );
                transition = VoteTransition::plan(Some(winner), value);
                if let VoteTransition::Flip(flipped) = transition {
                    tx.update_vote(key, flipped).await?;
                }
            }
        }
        VoteTransition::Flip(flipped) => tx.update_vote(key, flipped).await?,
        VoteTransition::Unchanged => {}
    }

    let delta = transition.points_delta();
    if delta != 0 {
        tx.adjust_points(key.post_id, delta).await?;
    }
    Ok(transition)
}
