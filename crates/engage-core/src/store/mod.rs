//! Storage seams for tenant configuration, cursors and idempotency markers.
//!
//! Every piece of state the poller needs between invocations lives behind
//! these traits. `engage-db` provides the Postgres implementation;
//! [`MemoryStore`] backs tests and local runs.

mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::engagement::{DispatchOutcome, EngagementType};
use crate::post_id::PostId;
use crate::tenant::Tenant;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corrupt stored value for {what}: {reason}")]
    Corrupt { what: String, reason: String },
}

/// Tenant configuration collaborator.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// All tenants, active or not, ordered by slug.
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError>;

    async fn get_tenant(&self, slug: &str) -> Result<Option<Tenant>, StoreError>;
}

/// Per (tenant, engagement type) high-water marks.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// `None` means this pair has never been polled.
    async fn get_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
    ) -> Result<Option<PostId>, StoreError>;

    async fn set_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
        id: PostId,
    ) -> Result<(), StoreError>;

    /// Removes the cursor so the next poll is treated as a first run.
    /// Returns whether a cursor existed.
    async fn clear_cursor(&self, tenant: &str, kind: EngagementType) -> Result<bool, StoreError>;
}

/// Processed markers plus the per-post actor sets used to reconstruct
/// likes and retweets.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn is_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
    ) -> Result<bool, StoreError>;

    async fn mark_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
        outcome: DispatchOutcome,
    ) -> Result<(), StoreError>;

    async fn get_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
    ) -> Result<Option<BTreeSet<String>>, StoreError>;

    async fn put_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
        actors: &BTreeSet<String>,
    ) -> Result<(), StoreError>;

    /// Drops markers and caches past their retention. Returns rows removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Long-lived handle → numeric user id mapping.
#[async_trait]
pub trait UserIdCache: Send + Sync {
    async fn get_user_id(&self, handle: &str) -> Result<Option<String>, StoreError>;

    async fn put_user_id(&self, handle: &str, user_id: &str) -> Result<(), StoreError>;
}

/// Everything the engine needs from persistence, as one object.
pub trait EngagementStore: TenantDirectory + CursorStore + IdempotencyStore + UserIdCache {}

impl<T> EngagementStore for T where
    T: TenantDirectory + CursorStore + IdempotencyStore + UserIdCache
{
}
