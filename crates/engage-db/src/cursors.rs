//! Database operations for the `poll_cursors` table.

use engage_core::{EngagementType, PostId};
use sqlx::PgPool;

use crate::{id_from_db, id_to_db, DbError};

/// Stored high-water mark for one (tenant, engagement type), if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_cursor(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
) -> Result<Option<PostId>, DbError> {
    let raw: Option<i64> = sqlx::query_scalar(
        "SELECT last_seen_id FROM poll_cursors \
         WHERE tenant_slug = $1 AND engagement_type = $2",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    raw.map(id_from_db).transpose()
}

/// Writes the cursor unconditionally; callers decide whether it moves.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn set_cursor(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
    id: PostId,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO poll_cursors (tenant_slug, engagement_type, last_seen_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (tenant_slug, engagement_type) DO UPDATE SET \
             last_seen_id = EXCLUDED.last_seen_id, \
             updated_at = NOW()",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .bind(id_to_db(id)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes the cursor. Returns whether one existed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_cursor(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "DELETE FROM poll_cursors WHERE tenant_slug = $1 AND engagement_type = $2",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
