//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors. At the boundary to `forum-core` they are
//! converted into [`StoreError`].

use forum_core::StoreError;

/// `PostgreSQL` SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// `PostgreSQL` SQLSTATE for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row held a value the domain types cannot represent.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether this is a `PostgreSQL` unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate_is(UNIQUE_VIOLATION)
    }

    /// Whether this is a `PostgreSQL` foreign-key violation, such as
    /// deleting a user whose votes are still counted.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate_is(FOREIGN_KEY_VIOLATION)
    }

    fn sqlstate_is(&self, code: &str) -> bool {
        match self {
            Self::Postgres(sqlx::Error::Database(db)) => db.code().as_deref() == Some(code),
            _ => false,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend(Box::new(err))
    }
}
