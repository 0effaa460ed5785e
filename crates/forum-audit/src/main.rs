//! Points audit for the forum.
//!
//! Verifies, across the whole `posts` table, that every post's `points`
//! equals the sum of its vote rows. Exits non-zero when any post drifted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `forum-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` with read-only sessions
//! 4. Run the audit and log every drifted post
//!
//! The audit never writes. Schema migrations are applied by the service that
//! owns the database, not by this tool.

mod error;

use std::path::Path;

use forum_core::{AuditResult, ForumConfig};
use forum_core::config::LoggingConfig;
use forum_db::{PostgresConfig, PostgresPool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AuditError;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "forum-config.yaml";

#[tokio::main]
async fn main() -> Result<(), AuditError> {
    let config = load_config()?;
    init_logging(&config.logging);

    info!(
        max_connections = config.infrastructure.max_connections,
        "forum-audit starting"
    );

    let pool = PostgresPool::connect(&audit_pool_config(&config)).await?;

    let result = pool.audit().verify_points().await;
    pool.close().await;

    match result? {
        AuditResult::Balanced => {
            info!("Points audit balanced");
            Ok(())
        }
        AuditResult::Anomaly(anomaly) => {
            for drift in &anomaly.drifts {
                warn!(
                    post_id = %drift.post_id,
                    recorded = drift.recorded,
                    actual = drift.actual,
                    "Post points drifted from vote sum"
                );
            }
            warn!(message = %anomaly, "Points audit failed");
            Err(AuditError::Drift {
                count: anomaly.drifts.len(),
            })
        }
    }
}

/// Pool settings for the audit: the configured database, read-only.
fn audit_pool_config(config: &ForumConfig) -> PostgresConfig {
    PostgresConfig::from(&config.infrastructure).read_only()
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load `forum-config.yaml` if present, otherwise defaults. Environment
/// overrides apply in both cases.
fn load_config() -> Result<ForumConfig, AuditError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(ForumConfig::from_file(config_path)?)
    } else {
        Ok(ForumConfig::parse("")?)
    }
}
