//! Database operations for `post_actor_cache`: the full actor set last seen
//! on each brand post, used to reconstruct likes and retweets.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use engage_core::{EngagementType, PostId, ACTOR_CACHE_RETENTION_DAYS};
use sqlx::PgPool;

use crate::{id_to_db, DbError};

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_actor_set(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
    post_id: PostId,
    now: DateTime<Utc>,
) -> Result<Option<BTreeSet<String>>, DbError> {
    let actors: Option<Vec<String>> = sqlx::query_scalar(
        "SELECT actor_ids FROM post_actor_cache \
         WHERE tenant_slug = $1 AND engagement_type = $2 AND post_id = $3 \
           AND expires_at > $4",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .bind(id_to_db(post_id)?)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(actors.map(|a| a.into_iter().collect()))
}

/// Replaces the cached set and restarts its retention window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn put_actor_set(
    pool: &PgPool,
    tenant: &str,
    kind: EngagementType,
    post_id: PostId,
    actors: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let actor_ids: Vec<&str> = actors.iter().map(String::as_str).collect();
    let expires_at = now + Duration::days(ACTOR_CACHE_RETENTION_DAYS);
    sqlx::query(
        "INSERT INTO post_actor_cache \
             (tenant_slug, engagement_type, post_id, actor_ids, updated_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (tenant_slug, engagement_type, post_id) DO UPDATE SET \
             actor_ids = EXCLUDED.actor_ids, \
             updated_at = EXCLUDED.updated_at, \
             expires_at = EXCLUDED.expires_at",
    )
    .bind(tenant)
    .bind(kind.as_str())
    .bind(id_to_db(post_id)?)
    .bind(&actor_ids)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}
