//! Postgres persistence for tenants, poll cursors, processed markers and
//! the actor / user-id caches.
//!
//! Each table has a module of free functions over a `PgPool`; [`PgStore`]
//! adapts them to the storage traits the engine consumes.

pub mod actor_cache;
pub mod cursors;
pub mod processed;
pub mod seed;
mod store;
pub mod tenants;
pub mod user_ids;

use std::time::Duration;

use engage_core::{AppConfig, PostId, StoreError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub use actor_cache::{get_actor_set, put_actor_set};
pub use cursors::{clear_cursor, get_cursor, set_cursor};
pub use processed::{is_processed, mark_processed, purge_expired};
pub use seed::seed_tenants;
pub use store::PgStore;
pub use tenants::{get_tenant, list_tenants, TenantRow};
pub use user_ids::{get_user_id, put_user_id};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/engage-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// A stored value does not map back onto the domain model.
    #[error("invalid stored value for {what}: {reason}")]
    InvalidValue { what: String, reason: String },
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidValue { what, reason } => StoreError::Corrupt { what, reason },
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // _sqlx_migrations does not exist on a fresh database; count that as zero.
    let applied_before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let applied_after = applied_migrations(pool).await;

    let delta = usize::try_from((applied_after - applied_before).max(0)).unwrap_or(0);
    if delta > 0 {
        tracing::info!(applied = delta, "database migrations applied");
    }
    Ok(delta)
}

async fn applied_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Post ids are stored as `BIGINT`.
pub(crate) fn id_to_db(id: PostId) -> Result<i64, DbError> {
    i64::try_from(id.get()).map_err(|_| DbError::InvalidValue {
        what: "post id".to_string(),
        reason: format!("{id} exceeds BIGINT range"),
    })
}

pub(crate) fn id_from_db(raw: i64) -> Result<PostId, DbError> {
    u64::try_from(raw)
        .map(PostId::new)
        .map_err(|_| DbError::InvalidValue {
            what: "post id".to_string(),
            reason: format!("negative id {raw}"),
        })
}
