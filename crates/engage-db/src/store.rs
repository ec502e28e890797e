use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use engage_core::{
    CursorStore, DispatchOutcome, EngagementType, IdempotencyStore, PostId, StoreError, Tenant,
    TenantDirectory, UserIdCache,
};
use sqlx::PgPool;

use crate::{actor_cache, cursors, processed, tenants, user_ids};

/// Postgres-backed implementation of the engine's storage traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgStore {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        Ok(tenants::list_tenants(&self.pool).await?)
    }

    async fn get_tenant(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(tenants::get_tenant(&self.pool, slug).await?)
    }
}

#[async_trait]
impl CursorStore for PgStore {
    async fn get_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
    ) -> Result<Option<PostId>, StoreError> {
        Ok(cursors::get_cursor(&self.pool, tenant, kind).await?)
    }

    async fn set_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
        id: PostId,
    ) -> Result<(), StoreError> {
        Ok(cursors::set_cursor(&self.pool, tenant, kind, id).await?)
    }

    async fn clear_cursor(&self, tenant: &str, kind: EngagementType) -> Result<bool, StoreError> {
        Ok(cursors::clear_cursor(&self.pool, tenant, kind).await?)
    }
}

#[async_trait]
impl IdempotencyStore for PgStore {
    async fn is_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
    ) -> Result<bool, StoreError> {
        Ok(processed::is_processed(&self.pool, tenant, kind, key, Utc::now()).await?)
    }

    async fn mark_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
        outcome: DispatchOutcome,
    ) -> Result<(), StoreError> {
        Ok(processed::mark_processed(&self.pool, tenant, kind, key, outcome, Utc::now()).await?)
    }

    async fn get_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
    ) -> Result<Option<BTreeSet<String>>, StoreError> {
        Ok(actor_cache::get_actor_set(&self.pool, tenant, kind, post_id, Utc::now()).await?)
    }

    async fn put_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
        actors: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        actor_cache::put_actor_set(&self.pool, tenant, kind, post_id, actors, Utc::now())
            .await
            .map_err(StoreError::from)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        Ok(processed::purge_expired(&self.pool, Utc::now()).await?)
    }
}

#[async_trait]
impl UserIdCache for PgStore {
    async fn get_user_id(&self, handle: &str) -> Result<Option<String>, StoreError> {
        Ok(user_ids::get_user_id(&self.pool, handle, Utc::now()).await?)
    }

    async fn put_user_id(&self, handle: &str, user_id: &str) -> Result<(), StoreError> {
        Ok(user_ids::put_user_id(&self.pool, handle, user_id, Utc::now()).await?)
    }
}
