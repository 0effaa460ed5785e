//! `Dragonfly` (Redis-compatible) session lookups.
//!
//! Sessions are written and expired by the auth layer. The forum only reads
//! them to learn who the viewer is.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `sess:{sid}` | JSON | Session record; `userId` is set once signed in |

use fred::prelude::*;
use serde::{Deserialize, Serialize};

use forum_core::config::InfrastructureConfig;
use forum_core::{SessionStore, StoreError};
use forum_types::UserId;

use crate::error::DbError;

/// Prefix shared with the session middleware.
const SESSION_PREFIX: &str = "sess:";

/// The part of a session record the forum cares about. Other fields written
/// by the session middleware (cookie settings, flash data) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The signed-in user, absent for anonymous sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

fn session_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL (`redis://host:port[/db]`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed and
    /// [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Connect to the session store named by `infrastructure.dragonfly_url`.
    ///
    /// # Errors
    ///
    /// See [`DragonflyPool::connect`].
    pub async fn from_config(infra: &InfrastructureConfig) -> Result<Self, DbError> {
        Self::connect(&infra.dragonfly_url).await
    }

    /// Read the session record stored under `sess:{session_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails and
    /// [`DbError::Serialization`] if the record is not valid JSON.
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, DbError> {
        let raw: Option<String> = self.client.get(session_key(session_id)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(DbError::from)
    }
}

impl SessionStore for DragonflyPool {
    async fn viewer(&self, session_id: &str) -> Result<Option<UserId>, StoreError> {
        let record = self.session(session_id).await?;
        Ok(record.and_then(|r| r.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_use_the_middleware_prefix() {
        assert_eq!(session_key("abc123"), "sess:abc123");
    }

    #[test]
    fn session_record_ignores_foreign_fields() {
        let user_id = UserId::new();
        let json = format!(
            r#"{{"cookie":{{"originalMaxAge":86400000,"httpOnly":true}},"userId":"{user_id}"}}"#
        );
        let record: Option<SessionRecord> = serde_json::from_str(&json).ok();
        assert_eq!(record.and_then(|r| r.user_id), Some(user_id));
    }

    #[test]
    fn anonymous_session_has_no_user() {
        let record: Option<SessionRecord> =
            serde_json::from_str(r#"{"cookie":{"originalMaxAge":86400000}}"#).ok();
        assert_eq!(record, Some(SessionRecord::default()));
    }
}
