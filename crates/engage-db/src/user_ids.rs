//! Database operations for `handle_user_ids`.

use chrono::{DateTime, Duration, Utc};
use engage_core::{normalize_handle, USER_ID_CACHE_TTL_DAYS};
use sqlx::PgPool;

use crate::DbError;

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_user_id(
    pool: &PgPool,
    handle: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, DbError> {
    let user_id = sqlx::query_scalar(
        "SELECT user_id FROM handle_user_ids WHERE handle = $1 AND expires_at > $2",
    )
    .bind(normalize_handle(handle))
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(user_id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn put_user_id(
    pool: &PgPool,
    handle: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO handle_user_ids (handle, user_id, resolved_at, expires_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (handle) DO UPDATE SET \
             user_id = EXCLUDED.user_id, \
             resolved_at = EXCLUDED.resolved_at, \
             expires_at = EXCLUDED.expires_at",
    )
    .bind(normalize_handle(handle))
    .bind(user_id)
    .bind(now)
    .bind(now + Duration::days(USER_ID_CACHE_TTL_DAYS))
    .execute(pool)
    .await?;
    Ok(())
}
