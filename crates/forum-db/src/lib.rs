//! Data layer for the forum (`PostgreSQL` + `Dragonfly`).
//!
//! `PostgreSQL` holds users, posts and votes and backs every `forum-core`
//! store trait except sessions. `Dragonfly` holds the session records the
//! auth layer writes, which this crate only reads to resolve the viewer.
//!
//! ```text
//! forum-core
//!     |
//!     +-- ReadStore / LedgerStore --> PostgresPool
//!     |       |-- PostStore   (feed pages, single posts)
//!     |       |-- UserStore   (creators by id)
//!     |       |-- VoteStore   (votes by composite key)
//!     |       +-- PgLedgerTx  (row-locked vote transactions)
//!     |
//!     +-- SessionStore -------------> DragonflyPool (sess:{sid})
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`post_store`] -- Post creation, lookup and keyset pages
//! - [`user_store`] -- Batched user reads
//! - [`vote_store`] -- Batched vote reads and the ledger transaction
//! - [`audit_store`] -- SQL points audit
//! - [`backend`] -- `forum-core` trait implementations
//! - [`dragonfly`] -- Session lookups
//! - [`error`] -- Shared error types

pub mod audit_store;
pub mod backend;
pub mod dragonfly;
pub mod error;
pub mod post_store;
pub mod postgres;
pub mod user_store;
pub mod vote_store;

// Re-export primary types for convenience.
pub use audit_store::{AuditStore, DriftRow};
pub use dragonfly::{DragonflyPool, SessionRecord};
pub use error::DbError;
pub use post_store::{PostRow, PostStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use user_store::{UserRow, UserStore};
pub use vote_store::{PgLedgerTx, VoteRow, VoteStore};
