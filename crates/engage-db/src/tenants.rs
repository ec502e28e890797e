//! Database operations for the `tenants` table.

use chrono::{DateTime, Utc};
use engage_core::{AccessTier, Tenant};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `tenants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: i64,
    pub slug: String,
    pub brand_id: String,
    pub handle: String,
    pub is_active: bool,
    pub encrypted_credential: String,
    pub access_tier: String,
    pub hashtags: Vec<String>,
    pub configured_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DbError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let access_tier = row
            .access_tier
            .parse::<AccessTier>()
            .map_err(|reason| DbError::InvalidValue {
                what: format!("tenants.access_tier for '{}'", row.slug),
                reason,
            })?;
        Ok(Tenant {
            slug: row.slug,
            brand_id: row.brand_id,
            handle: row.handle,
            active: row.is_active,
            encrypted_credential: row.encrypted_credential,
            access_tier,
            hashtags: row.hashtags,
            configured_at: row.configured_at,
        })
    }
}

const TENANT_COLUMNS: &str = "id, slug, brand_id, handle, is_active, encrypted_credential, \
                              access_tier, hashtags, configured_at";

/// Every tenant, active or not, ordered by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidValue`]
/// if a row carries an unknown access tier.
pub async fn list_tenants(pool: &PgPool) -> Result<Vec<Tenant>, DbError> {
    let rows = sqlx::query_as::<_, TenantRow>(&format!(
        "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY slug"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Tenant::try_from).collect()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure, or [`DbError::InvalidValue`]
/// if the row carries an unknown access tier.
pub async fn get_tenant(pool: &PgPool, slug: &str) -> Result<Option<Tenant>, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(&format!(
        "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(Tenant::try_from).transpose()
}
