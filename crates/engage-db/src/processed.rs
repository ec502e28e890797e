//! Database operations for `processed_engagements`, plus retention purging.

use chrono::{DateTime, Duration, Utc};
use engage_core::{DispatchOutcome, EngagementType, PROCESSED_RETENTION_DAYS};
use sqlx::PgPool;

use crate::DbError;

/// Whether a live (unexpired) marker exists for the engagement.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn is_processed(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
    key: &str,
    now: DateTime<Utc>,
) -> Result<bool, DbError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS ( \
             SELECT 1 FROM processed_engagements \
             WHERE tenant_slug = $1 AND engagement_type = $2 \
               AND engagement_key = $3 AND expires_at > $4 \
         )",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .bind(key)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Records the dispatch outcome and restarts the retention window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn mark_processed(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
    key: &str,
    outcome: DispatchOutcome,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let expires_at = now + Duration::days(PROCESSED_RETENTION_DAYS);
    sqlx::query(
        "INSERT INTO processed_engagements \
             (tenant_slug, engagement_type, engagement_key, outcome, processed_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (tenant_slug, engagement_type, engagement_key) DO UPDATE SET \
             outcome = EXCLUDED.outcome, \
             processed_at = EXCLUDED.processed_at, \
             expires_at = EXCLUDED.expires_at",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .bind(key)
    .bind(outcome.as_str())
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes expired markers, actor sets and user-id mappings in one
/// transaction. Returns the total rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any delete fails; nothing is removed then.
pub async fn purge_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut removed = 0u64;

    for table in ["processed_engagements", "post_actor_cache", "handle_user_ids"] {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires_at <= $1"))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        removed += result.rows_affected();
    }

    tx.commit().await?;
    Ok(removed)
}
