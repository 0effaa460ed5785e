//! Points invariant verification.
//!
//! The ledger maintains `points` incrementally and never rescans votes on
//! the hot path. This module is the offline check that the incremental
//! bookkeeping still agrees with the vote rows:
//!
//! ```text
//! for every post P:  P.points == sum(v.value for v in votes where v.post_id == P.id)
//! ```
//!
//! A mismatch produces a [`PointsAnomaly`] listing every drifted post. The
//! check holds by construction for ledger-written data; it exists to catch
//! writes that bypassed the ledger.

use std::collections::BTreeMap;

use forum_types::{Post, PostId, Vote};

/// A single post whose stored points disagree with its votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsDrift {
    /// The affected post.
    pub post_id: PostId,
    /// The `points` value stored on the post.
    pub recorded: i64,
    /// The sum of the post's vote rows.
    pub actual: i64,
}

/// An invariant violation covering one or more posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAnomaly {
    /// Every drifted post, ordered by post ID.
    pub drifts: Vec<PointsDrift>,
    /// Human-readable summary.
    pub message: String,
}

impl core::fmt::Display for PointsAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Outcome of a points audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Every post's points match its votes.
    Balanced,
    /// At least one post drifted.
    Anomaly(PointsAnomaly),
}

impl AuditResult {
    /// Build a result from a list of drifts found by any backend.
    pub fn from_drifts(mut drifts: Vec<PointsDrift>) -> Self {
        if drifts.is_empty() {
            return Self::Balanced;
        }
        drifts.sort_unstable_by_key(|d| d.post_id);
        let count = drifts.len();
        Self::Anomaly(PointsAnomaly {
            drifts,
            message: format!("POINTS_DRIFT: {count} post(s) disagree with their vote rows"),
        })
    }
}

/// Verify `points == sum(votes)` for every post in `posts`.
///
/// Votes referencing posts outside `posts` are ignored.
pub fn verify_points(posts: &[Post], votes: &[Vote]) -> AuditResult {
    let mut sums: BTreeMap<PostId, i64> = BTreeMap::new();
    for vote in votes {
        let sum = sums.entry(vote.post_id).or_insert(0);
        *sum = sum.saturating_add(i64::from(vote.value.as_i32()));
    }

    let drifts = posts
        .iter()
        .filter_map(|post| {
            let actual = sums.get(&post.id).copied().unwrap_or(0);
            let recorded = i64::from(post.points);
            (recorded != actual).then_some(PointsDrift {
                post_id: post.id,
                recorded,
                actual,
            })
        })
        .collect();

    AuditResult::from_drifts(drifts)
}
