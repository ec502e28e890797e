use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{CursorStore, IdempotencyStore, StoreError, TenantDirectory, UserIdCache};
use crate::engagement::{DispatchOutcome, EngagementType};
use crate::post_id::PostId;
use crate::tenant::{normalize_handle, Tenant};
use crate::{ACTOR_CACHE_RETENTION_DAYS, PROCESSED_RETENTION_DAYS, USER_ID_CACHE_TTL_DAYS};

type Scoped<K> = (String, EngagementType, K);

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Expiring<T> {
    fn live(&self, now: DateTime<Utc>) -> Option<&T> {
        (self.expires_at > now).then_some(&self.value)
    }
}

#[derive(Debug, Default)]
struct State {
    tenants: Vec<Tenant>,
    cursors: HashMap<(String, EngagementType), PostId>,
    processed: HashMap<Scoped<String>, Expiring<DispatchOutcome>>,
    actors: HashMap<Scoped<PostId>, Expiring<BTreeSet<String>>>,
    user_ids: HashMap<String, Expiring<String>>,
}

/// Process-local store with the same retention semantics as Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tenants(tenants: Vec<Tenant>) -> Self {
        let store = Self::default();
        store.lock().tenants = tenants;
        store
    }

    /// Outcome recorded for a marker, ignoring retention.
    #[must_use]
    pub fn marker(&self, tenant: &str, kind: EngagementType, key: &str) -> Option<DispatchOutcome> {
        self.lock()
            .processed
            .get(&(tenant.to_string(), kind, key.to_string()))
            .map(|e| e.value)
    }

    /// Number of processed markers held for a tenant.
    #[must_use]
    pub fn marker_count(&self, tenant: &str) -> usize {
        self.lock()
            .processed
            .keys()
            .filter(|(t, _, _)| t == tenant)
            .count()
    }

    /// Ages every marker and cache entry as if `by` had elapsed.
    pub fn advance_clock(&self, by: Duration) {
        let mut state = self.lock();
        for entry in state.processed.values_mut() {
            entry.expires_at -= by;
        }
        for entry in state.actors.values_mut() {
            entry.expires_at -= by;
        }
        for entry in state.user_ids.values_mut() {
            entry.expires_at -= by;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Writes are single map operations, so a poisoned map is still consistent.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl TenantDirectory for MemoryStore {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        let mut tenants = self.lock().tenants.clone();
        tenants.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(tenants)
    }

    async fn get_tenant(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.lock().tenants.iter().find(|t| t.slug == slug).cloned())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn get_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
    ) -> Result<Option<PostId>, StoreError> {
        Ok(self.lock().cursors.get(&(tenant.to_string(), kind)).copied())
    }

    async fn set_cursor(
        &self,
        tenant: &str,
        kind: EngagementType,
        id: PostId,
    ) -> Result<(), StoreError> {
        self.lock().cursors.insert((tenant.to_string(), kind), id);
        Ok(())
    }

    async fn clear_cursor(&self, tenant: &str, kind: EngagementType) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .cursors
            .remove(&(tenant.to_string(), kind))
            .is_some())
    }
}

#[async_trait]
impl IdempotencyStore for MemoryStore {
    async fn is_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
    ) -> Result<bool, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .processed
            .get(&(tenant.to_string(), kind, key.to_string()))
            .and_then(|e| e.live(now))
            .is_some())
    }

    async fn mark_processed(
        &self,
        tenant: &str,
        kind: EngagementType,
        key: &str,
        outcome: DispatchOutcome,
    ) -> Result<(), StoreError> {
        let entry = Expiring {
            value: outcome,
            expires_at: Utc::now() + Duration::days(PROCESSED_RETENTION_DAYS),
        };
        self.lock()
            .processed
            .insert((tenant.to_string(), kind, key.to_string()), entry);
        Ok(())
    }

    async fn get_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
    ) -> Result<Option<BTreeSet<String>>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .actors
            .get(&(tenant.to_string(), kind, post_id))
            .and_then(|e| e.live(now))
            .cloned())
    }

    async fn put_actor_set(
        &self,
        tenant: &str,
        kind: EngagementType,
        post_id: PostId,
        actors: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let entry = Expiring {
            value: actors.clone(),
            expires_at: Utc::now() + Duration::days(ACTOR_CACHE_RETENTION_DAYS),
        };
        self.lock()
            .actors
            .insert((tenant.to_string(), kind, post_id), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut state = self.lock();
        let before = state.processed.len() + state.actors.len() + state.user_ids.len();
        state.processed.retain(|_, e| e.expires_at > now);
        state.actors.retain(|_, e| e.expires_at > now);
        state.user_ids.retain(|_, e| e.expires_at > now);
        let after = state.processed.len() + state.actors.len() + state.user_ids.len();
        Ok(u64::try_from(before - after).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl UserIdCache for MemoryStore {
    async fn get_user_id(&self, handle: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()
            .user_ids
            .get(&normalize_handle(handle))
            .and_then(|e| e.live(now))
            .cloned())
    }

    async fn put_user_id(&self, handle: &str, user_id: &str) -> Result<(), StoreError> {
        let entry = Expiring {
            value: user_id.to_string(),
            expires_at: Utc::now() + Duration::days(USER_ID_CACHE_TTL_DAYS),
        };
        self.lock()
            .user_ids
            .insert(normalize_handle(handle), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::tests::sample_tenant;

    #[tokio::test]
    async fn cursor_is_absent_until_set_and_cleared_again() {
        let store = MemoryStore::new();
        let kind = EngagementType::Mention;
        assert_eq!(store.get_cursor("acme", kind).await.unwrap(), None);

        store.set_cursor("acme", kind, PostId::new(10)).await.unwrap();
        assert_eq!(
            store.get_cursor("acme", kind).await.unwrap(),
            Some(PostId::new(10))
        );
        assert_eq!(
            store.get_cursor("acme", EngagementType::Reply).await.unwrap(),
            None,
            "cursors are scoped per engagement type"
        );

        assert!(store.clear_cursor("acme", kind).await.unwrap());
        assert!(!store.clear_cursor("acme", kind).await.unwrap());
        assert_eq!(store.get_cursor("acme", kind).await.unwrap(), None);
    }

    #[tokio::test]
    async fn processed_markers_expire_after_retention() {
        let store = MemoryStore::new();
        let kind = EngagementType::Reply;
        store
            .mark_processed("acme", kind, "77", DispatchOutcome::Failed)
            .await
            .unwrap();
        assert!(store.is_processed("acme", kind, "77").await.unwrap());
        assert!(!store.is_processed("globex", kind, "77").await.unwrap());
        assert_eq!(store.marker("acme", kind, "77"), Some(DispatchOutcome::Failed));

        store.advance_clock(Duration::days(PROCESSED_RETENTION_DAYS + 1));
        assert!(!store.is_processed("acme", kind, "77").await.unwrap());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.marker_count("acme"), 0);
    }

    #[tokio::test]
    async fn actor_sets_outlive_processed_markers() {
        let store = MemoryStore::new();
        let kind = EngagementType::Like;
        let actors: BTreeSet<String> = ["1", "2"].iter().map(ToString::to_string).collect();
        store
            .put_actor_set("acme", kind, PostId::new(5), &actors)
            .await
            .unwrap();

        store.advance_clock(Duration::days(PROCESSED_RETENTION_DAYS + 1));
        assert_eq!(
            store
                .get_actor_set("acme", kind, PostId::new(5))
                .await
                .unwrap(),
            Some(actors)
        );
    }

    #[tokio::test]
    async fn user_id_cache_is_case_insensitive() {
        let store = MemoryStore::new();
        store.put_user_id("@AcmeCo", "123").await.unwrap();
        assert_eq!(
            store.get_user_id("acmeco").await.unwrap().as_deref(),
            Some("123")
        );
    }

    #[tokio::test]
    async fn tenants_are_listed_by_slug() {
        let store = MemoryStore::with_tenants(vec![sample_tenant("zeta"), sample_tenant("alpha")]);
        let slugs: Vec<String> = store
            .list_tenants()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
        assert!(store.get_tenant("missing").await.unwrap().is_none());
    }
}
