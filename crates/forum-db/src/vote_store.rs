//! Operations on the `votes` table.
//!
//! Reads go through [`VoteStore::by_keys`], one round trip per loader
//! window. Writes only happen inside a [`PgLedgerTx`], which the vote ledger
//! drives through the `forum-core` [`LedgerTx`] trait.
//!
//! # Locking
//!
//! `lock_post` takes `SELECT ... FOR UPDATE` on the post row, so casts on
//! the same post serialize for the rest of the transaction. Vote inserts use
//! `ON CONFLICT DO NOTHING` and report the conflict instead of aborting the
//! transaction, so the ledger can re-read and re-plan in place.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use forum_core::{InsertOutcome, LedgerTx, StoreError};
use forum_types::{PostId, UserId, Vote, VoteKey, VoteValue};

use crate::error::DbError;

/// Batched reads of the `votes` table.
pub struct VoteStore<'a> {
    pool: &'a PgPool,
}

impl<'a> VoteStore<'a> {
    /// Create a vote store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch every vote matching one of `keys` in a single query.
    ///
    /// The composite keys are passed as two parallel arrays and joined with
    /// `UNNEST`, which keeps the statement text constant regardless of how
    /// many keys the window holds.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails and
    /// [`DbError::InvalidRow`] if a stored value is not `-1` or `1`.
    pub async fn by_keys(&self, keys: &[VoteKey]) -> Result<Vec<Vote>, DbError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let (user_ids, post_ids): (Vec<Uuid>, Vec<Uuid>) = keys
            .iter()
            .map(|key| (key.user_id.into_inner(), key.post_id.into_inner()))
            .unzip();

        let rows = sqlx::query_as::<_, VoteRow>(
            r"SELECT v.user_id, v.post_id, v.value
              FROM votes v
              JOIN UNNEST($1::UUID[], $2::UUID[]) AS k(user_id, post_id)
                ON v.user_id = k.user_id AND v.post_id = k.post_id",
        )
        .bind(&user_ids)
        .bind(&post_ids)
        .fetch_all(self.pool)
        .await?;

        tracing::debug!(requested = keys.len(), found = rows.len(), "Loaded votes by key");
        rows.into_iter().map(Vote::try_from).collect()
    }
}

/// A row from the `votes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteRow {
    /// Voting user's UUID.
    pub user_id: Uuid,
    /// Post UUID.
    pub post_id: Uuid,
    /// Stored value, constrained to `-1` or `1`.
    pub value: i16,
}

impl TryFrom<VoteRow> for Vote {
    type Error = DbError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from(row.user_id),
            post_id: PostId::from(row.post_id),
            value: vote_value(row.value)?,
        })
    }
}

fn vote_value(raw: i16) -> Result<VoteValue, DbError> {
    VoteValue::try_from(raw).map_err(|e| DbError::InvalidRow(e.to_string()))
}

/// An open ledger transaction on `PostgreSQL`.
///
/// Dropping it without calling [`LedgerTx::commit`] rolls back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    /// Begin a transaction on `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if no connection can be acquired.
    pub async fn begin(pool: &PgPool) -> Result<Self, DbError> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl LedgerTx for PgLedgerTx {
    async fn lock_post(&mut self, post_id: PostId) -> Result<bool, StoreError> {
        let locked: Option<Uuid> =
            sqlx::query_scalar(r"SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id.into_inner())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        Ok(locked.is_some())
    }

    async fn find_vote(&mut self, key: VoteKey) -> Result<Option<VoteValue>, StoreError> {
        let raw: Option<i16> =
            sqlx::query_scalar(r"SELECT value FROM votes WHERE user_id = $1 AND post_id = $2")
                .bind(key.user_id.into_inner())
                .bind(key.post_id.into_inner())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(DbError::from)?;
        Ok(raw.map(vote_value).transpose()?)
    }

    async fn insert_vote(
        &mut self,
        key: VoteKey,
        value: VoteValue,
    ) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO votes (user_id, post_id, value)
              VALUES ($1, $2, $3)
              ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(key.user_id.into_inner())
        .bind(key.post_id.into_inner())
        .bind(i16::from(value))
        .execute(&mut *self.tx)
        .await
        .map_err(DbError::from);

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(InsertOutcome::Conflict),
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if err.is_unique_violation() => Err(StoreError::DuplicateVote {
                user_id: key.user_id,
                post_id: key.post_id,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_vote(&mut self, key: VoteKey, value: VoteValue) -> Result<(), StoreError> {
        sqlx::query(r"UPDATE votes SET value = $3 WHERE user_id = $1 AND post_id = $2")
            .bind(key.user_id.into_inner())
            .bind(key.post_id.into_inner())
            .bind(i16::from(value))
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn adjust_points(&mut self, post_id: PostId, delta: i32) -> Result<(), StoreError> {
        let done = sqlx::query(r"UPDATE posts SET points = points + $2 WHERE id = $1")
            .bind(post_id.into_inner())
            .bind(delta)
            .execute(&mut *self.tx)
            .await
            .map_err(DbError::from)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::PostNotFound(post_id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }
}
