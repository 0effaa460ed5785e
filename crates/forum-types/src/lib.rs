//! Shared type definitions for the forum vote ledger and feed.
//!
//! This crate is the single source of truth for the entities the core
//! operates on. Types flow downstream to `TypeScript` via `ts-rs` for the
//! web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for post and user identifiers
//! - [`enums`] -- The normalized two-valued [`VoteValue`]
//! - [`structs`] -- `Post`, `User`, `Vote` and the composite `VoteKey`

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{InvalidVoteValue, VoteValue};
pub use ids::{PostId, UserId};
pub use structs::{NewPost, Post, User, Vote, VoteKey};
