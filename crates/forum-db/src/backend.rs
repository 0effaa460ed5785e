//! `forum-core` store traits for [`PostgresPool`].

use forum_core::{Cursor, LedgerStore, ReadStore, StoreError};
use forum_types::{Post, PostId, User, UserId, Vote, VoteKey};

use crate::postgres::PostgresPool;
use crate::vote_store::PgLedgerTx;

impl ReadStore for PostgresPool {
    async fn posts_before(
        &self,
        boundary: Option<Cursor>,
        fetch: usize,
    ) -> Result<Vec<Post>, StoreError> {
        Ok(self.posts().page_before(boundary, fetch).await?)
    }

    async fn post_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        Ok(self.posts().get(id).await?)
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        Ok(self.users().by_ids(ids).await?)
    }

    async fn votes_by_keys(&self, keys: &[VoteKey]) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes().by_keys(keys).await?)
    }
}

impl LedgerStore for PostgresPool {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, StoreError> {
        Ok(PgLedgerTx::begin(self.pool()).await?)
    }
}
