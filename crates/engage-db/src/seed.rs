use engage_core::TenantConfig;
use sqlx::PgPool;

use crate::DbError;

/// Upsert tenants from the provisioning file.
///
/// Returns the number of tenants processed (inserted or updated). All upserts
/// run inside a single transaction; if any fails the batch is rolled back.
/// `configured_at` moves only when the credential, handle or tier changes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_tenants(pool: &PgPool, tenants: &[TenantConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for tenant in tenants {
        sqlx::query(
            "INSERT INTO tenants \
                 (slug, brand_id, handle, is_active, encrypted_credential, access_tier, hashtags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (slug) DO UPDATE SET \
                 brand_id = EXCLUDED.brand_id, \
                 handle = EXCLUDED.handle, \
                 is_active = EXCLUDED.is_active, \
                 encrypted_credential = EXCLUDED.encrypted_credential, \
                 access_tier = EXCLUDED.access_tier, \
                 hashtags = EXCLUDED.hashtags, \
                 configured_at = CASE \
                     WHEN tenants.encrypted_credential IS DISTINCT FROM EXCLUDED.encrypted_credential \
                       OR tenants.handle IS DISTINCT FROM EXCLUDED.handle \
                       OR tenants.access_tier IS DISTINCT FROM EXCLUDED.access_tier \
                     THEN NOW() ELSE tenants.configured_at END, \
                 updated_at = NOW()",
        )
        .bind(&tenant.slug)
        .bind(&tenant.brand_id)
        .bind(&tenant.handle)
        .bind(tenant.active)
        .bind(&tenant.credential)
        .bind(tenant.access_tier.as_str())
        .bind(&tenant.hashtags)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    tracing::info!(count, "tenants seeded");
    Ok(count)
}
