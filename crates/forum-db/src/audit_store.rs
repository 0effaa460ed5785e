//! Full-table verification of `posts.points` against the `votes` table.
//!
//! This is an operator check, run by the `forum-audit` binary. It scans
//! every post, so nothing on the request path calls it.

use sqlx::PgPool;
use uuid::Uuid;

use forum_core::audit::{AuditResult, PointsDrift};
use forum_types::PostId;

use crate::error::DbError;

/// Runs the points audit in SQL.
pub struct AuditStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditStore<'a> {
    /// Create an audit store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compare every post's points to the sum of its votes.
    ///
    /// Runs in a single `REPEATABLE READ` snapshot so concurrent casts cannot
    /// produce a false positive halfway through the scan.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn verify_points(&self) -> Result<AuditResult, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, DriftRow>(
            r"SELECT p.id AS post_id,
                     p.points::BIGINT AS recorded,
                     COALESCE(SUM(v.value), 0)::BIGINT AS actual
              FROM posts p
              LEFT JOIN votes v ON v.post_id = p.id
              GROUP BY p.id, p.points
              HAVING p.points <> COALESCE(SUM(v.value), 0)",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(drifted = rows.len(), "Points audit scanned posts");
        Ok(AuditResult::from_drifts(
            rows.into_iter().map(PointsDrift::from).collect(),
        ))
    }
}

/// One drifted post as returned by the audit query.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct DriftRow {
    /// The post whose points disagree with its votes.
    pub post_id: Uuid,
    /// `posts.points`.
    pub recorded: i64,
    /// `SUM(votes.value)` for the post.
    pub actual: i64,
}

impl From<DriftRow> for PointsDrift {
    fn from(row: DriftRow) -> Self {
        Self {
            post_id: PostId::from(row.post_id),
            recorded: row.recorded,
            actual: row.actual,
        }
    }
}
