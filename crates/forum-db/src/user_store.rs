//! Operations on the `users` table.
//!
//! Registration belongs to the auth layer. The feed only reads users, in
//! batches, through the creator loader, and never selects the password hash.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use forum_types::{User, UserId};

use crate::error::DbError;

/// Operations on the `users` table.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a user store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch every user whose ID is in `ids` in one round trip. Unknown IDs
    /// are skipped; row order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().copied().map(UserId::into_inner).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, created_at, updated_at
              FROM users
              WHERE id = ANY($1::UUID[])",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        tracing::debug!(requested = ids.len(), found = rows.len(), "Loaded users by id");
        Ok(rows.into_iter().map(User::from).collect())
    }
}

/// A row from the `users` table, without credentials.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User UUID.
    pub id: Uuid,
    /// Unique display name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from(row.id),
            username: row.username,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
