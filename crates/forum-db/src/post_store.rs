//! Operations on the `posts` table.
//!
//! Feed reads walk the `posts_feed_idx` index on `(created_at DESC, id DESC)`
//! with a row-value comparison, so a page deep in the feed costs the same
//! as the first one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use forum_core::Cursor;
use forum_types::{NewPost, Post, PostId, UserId};

use crate::error::DbError;

/// Operations on the `posts` table.
pub struct PostStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PostStore<'a> {
    /// Create a post store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new post with zero points. The database assigns both
    /// timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails, including when the
    /// creator does not exist.
    pub async fn create(&self, input: &NewPost) -> Result<Post, DbError> {
        let row = sqlx::query_as::<_, PostRow>(
            r"INSERT INTO posts (id, title, content, creator_id)
              VALUES ($1, $2, $3, $4)
              RETURNING id, title, content, creator_id, points, created_at, updated_at",
        )
        .bind(PostId::new().into_inner())
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.creator_id.into_inner())
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(post_id = %row.id, "Created post");
        Ok(row.into())
    }

    /// Fetch a single post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: PostId) -> Result<Option<Post>, DbError> {
        let row = sqlx::query_as::<_, PostRow>(
            r"SELECT id, title, content, creator_id, points, created_at, updated_at
              FROM posts
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// Fetch up to `fetch` posts in feed order, strictly after `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn page_before(
        &self,
        boundary: Option<Cursor>,
        fetch: usize,
    ) -> Result<Vec<Post>, DbError> {
        let limit = i64::try_from(fetch).unwrap_or(i64::MAX);
        let boundary_at: Option<DateTime<Utc>> = boundary.map(|c| c.created_at);
        let boundary_id: Option<Uuid> = boundary.map(|c| c.id.into_inner());

        let rows = sqlx::query_as::<_, PostRow>(
            r"SELECT id, title, content, creator_id, points, created_at, updated_at
              FROM posts
              WHERE $1::TIMESTAMPTZ IS NULL OR (created_at, id) < ($1::TIMESTAMPTZ, $2::UUID)
              ORDER BY created_at DESC, id DESC
              LIMIT $3",
        )
        .bind(boundary_at)
        .bind(boundary_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    /// Post UUID.
    pub id: Uuid,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// Creator's user UUID.
    pub creator_id: Uuid,
    /// Running vote total.
    pub points: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::from(row.id),
            title: row.title,
            content: row.content,
            creator_id: UserId::from(row.creator_id),
            points: row.points,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
