//! Enumeration types for the forum.
//!
//! A vote is two-valued: the UI offers an up button and a down button, so
//! every caller-supplied value collapses to one of [`VoteValue::Up`] or
//! [`VoteValue::Down`]. There is no neutral variant; "no vote" is the
//! absence of a vote row.

use serde::{Deserialize, Serialize};

/// The normalized value of a single user's vote on a post.
///
/// Serialized as the integer `1` or `-1` so stored and transmitted votes
/// match the signed contribution they make to `Post::points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum VoteValue {
    /// An upvote, contributing `+1`.
    Up,
    /// A downvote, contributing `-1`.
    Down,
}

impl VoteValue {
    /// Normalize an arbitrary caller-supplied value.
    ///
    /// Exactly `-1` maps to [`VoteValue::Down`]; anything else is an upvote.
    pub const fn normalize(raw: i32) -> Self {
        if raw == -1 { Self::Down } else { Self::Up }
    }

    /// The signed contribution of this vote to a post's points.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl From<VoteValue> for i16 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

/// Error returned when a stored integer is not a valid vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidVoteValue(pub i16);

impl core::fmt::Display for InvalidVoteValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid vote value {}, expected 1 or -1", self.0)
    }
}

impl std::error::Error for InvalidVoteValue {}

impl TryFrom<i16> for VoteValue {
    type Error = InvalidVoteValue;

    fn try_from(raw: i16) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(InvalidVoteValue(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_one_is_the_only_downvote() {
        assert_eq!(VoteValue::normalize(-1), VoteValue::Down);
        assert_eq!(VoteValue::normalize(1), VoteValue::Up);
        assert_eq!(VoteValue::normalize(0), VoteValue::Up);
        assert_eq!(VoteValue::normalize(7), VoteValue::Up);
        assert_eq!(VoteValue::normalize(-5), VoteValue::Up);
    }

    #[test]
    fn serializes_as_signed_integer() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).ok().as_deref(), Some("-1"));
        let parsed: Result<VoteValue, _> = serde_json::from_str("1");
        assert_eq!(parsed.ok(), Some(VoteValue::Up));
        let rejected: Result<VoteValue, _> = serde_json::from_str("0");
        assert!(rejected.is_err());
    }

    #[test]
    fn stored_values_outside_range_are_rejected() {
        assert_eq!(VoteValue::try_from(2), Err(InvalidVoteValue(2)));
        assert_eq!(VoteValue::try_from(-1), Ok(VoteValue::Down));
    }
}
