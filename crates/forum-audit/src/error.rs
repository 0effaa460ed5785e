//! Error types for the audit binary.

/// Top-level error for the audit binary.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: forum_core::ConfigError,
    },

    /// Connecting to or querying `PostgreSQL` failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: forum_db::DbError,
    },

    /// The audit ran and found posts whose points disagree with their votes.
    #[error("points drift detected on {count} post(s)")]
    Drift {
        /// Number of drifted posts.
        count: usize,
    },
}
