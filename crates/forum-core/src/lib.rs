//! Vote ledger, batched entity loader, and keyset feed pagination.
//!
//! This crate owns the consistency-critical core of the forum: the single
//! writer of vote rows and post aggregates, the per-request loaders that
//! keep feed rendering free of N+1 queries, and cursor pagination over the
//! post feed. Persistence is reached only through the traits in [`store`].
//!
//! ```text
//! request
//!     |
//!     +-- RequestContext (viewer, creator loader, vote loader)
//!     |
//!     +-- Feed::page ----> paginate_posts --> ReadStore::posts_before
//!     |       +----------> creator loader --> ReadStore::users_by_ids   (1 call)
//!     |       +----------> vote loader -----> ReadStore::votes_by_keys  (1 call)
//!     |
//!     +-- Feed::cast_vote --> VoteLedger --> LedgerStore::begin .. commit
//! ```
//!
//! # Modules
//!
//! - [`audit`] -- Offline verification of `points == sum(votes)`.
//! - [`config`] -- Configuration loading from `forum-config.yaml`.
//! - [`context`] -- Per-request viewer and loaders.
//! - [`error`] -- Store, loader and feed error types.
//! - [`feed`] -- Page and single-post rendering.
//! - [`ledger`] -- The transactional vote ledger.
//! - [`loader`] -- The request-scoped [`BatchLoader`].
//! - [`memory`] -- In-process store used by tests and local tooling.
//! - [`pagination`] -- Keyset cursors and page slicing.
//! - [`store`] -- Persistence traits implemented by backends.
//!
//! [`BatchLoader`]: loader::BatchLoader

pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod loader;
pub mod memory;
pub mod pagination;
pub mod store;

pub use audit::{AuditResult, PointsAnomaly, PointsDrift, verify_points};
pub use config::{ConfigError, ForumConfig};
pub use context::RequestContext;
pub use error::{FeedError, LoadError, StoreError};
pub use feed::{Feed, FeedItem, FeedPage};
pub use ledger::{VoteLedger, VoteTransition};
pub use loader::{BatchFetch, BatchLoader, LoaderKey};
pub use memory::MemoryStore;
pub use pagination::{Cursor, MAX_PAGE_SIZE, PostPage, effective_limit, paginate_posts};
pub use store::{InsertOutcome, LedgerStore, LedgerTx, ReadStore, SessionStore};
