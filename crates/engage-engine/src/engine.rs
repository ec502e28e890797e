use std::sync::Arc;
use std::time::Duration;

use engage_core::{normalize_handle, AppConfig, EngagementStore, PostId, Tenant};
use engage_dispatch::RewardDispatcher;
use engage_upstream::{UpstreamClient, UpstreamSession};
use engage_vault::{Credential, CredentialVault};

use crate::error::PollError;

/// Knobs that shape a run, separate from the collaborators.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Brand posts inspected for likes, retweets and thread replies.
    pub recent_post_limit: usize,
    /// Time budget for one tenant; checked between engagement types.
    pub tenant_deadline: Duration,
    pub max_concurrent_tenants: usize,
    /// Fetch and filter only: no dispatch, markers, cache or cursor writes.
    pub dry_run: bool,
}

impl EngineOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            recent_post_limit: config.recent_post_limit,
            tenant_deadline: Duration::from_secs(config.tenant_deadline_secs),
            max_concurrent_tenants: config.max_concurrent_tenants,
            dry_run: false,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            recent_post_limit: 5,
            tenant_deadline: Duration::from_secs(120),
            max_concurrent_tenants: 1,
            dry_run: false,
        }
    }
}

/// Engagement Poller and Tenant Orchestrator over shared collaborators.
pub struct Engine {
    pub(crate) store: Arc<dyn EngagementStore>,
    vault: Option<Arc<CredentialVault>>,
    pub(crate) upstream: UpstreamClient,
    pub(crate) dispatcher: RewardDispatcher,
    pub(crate) options: EngineOptions,
}

/// Per-tenant state resolved once per cycle and shared by its polls.
pub(crate) struct TenantContext {
    pub tenant: Tenant,
    pub handle: String,
    credential: Credential,
    pub brand_user_id: String,
    recent_posts: Option<Vec<PostId>>,
}

impl TenantContext {
    pub fn slug(&self) -> &str {
        &self.tenant.slug
    }
}

impl Engine {
    #[must_use]
    pub fn new(
        store: Arc<dyn EngagementStore>,
        vault: Option<Arc<CredentialVault>>,
        upstream: UpstreamClient,
        dispatcher: RewardDispatcher,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            vault,
            upstream,
            dispatcher,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub(crate) fn session<'a>(&'a self, ctx: &'a TenantContext) -> UpstreamSession<'a> {
        self.upstream.session(ctx.credential.expose())
    }

    /// Decrypts the tenant's credential and resolves its brand user id.
    pub(crate) async fn prepare(&self, tenant: Tenant) -> Result<TenantContext, PollError> {
        let handle = normalize_handle(&tenant.handle);
        if handle.is_empty() {
            return Err(PollError::config(format!(
                "tenant '{}' has no monitored handle",
                tenant.slug
            )));
        }
        let credential = self.open_credential(&tenant)?;

        let mut ctx = TenantContext {
            tenant,
            handle,
            credential,
            brand_user_id: String::new(),
            recent_posts: None,
        };
        ctx.brand_user_id = self.resolve_user_id(&ctx).await?;
        Ok(ctx)
    }

    fn open_credential(&self, tenant: &Tenant) -> Result<Credential, PollError> {
        let blob = tenant.encrypted_credential.trim();
        if blob.is_empty() {
            return Err(PollError::config(format!(
                "tenant '{}' has no upstream credential",
                tenant.slug
            )));
        }
        match &self.vault {
            Some(vault) => Ok(vault.decrypt(blob)?),
            None if engage_vault::is_sealed(blob) => Err(PollError::config(format!(
                "credential for tenant '{}' is encrypted but no vault key is configured",
                tenant.slug
            ))),
            None => {
                tracing::warn!(
                    tenant = %tenant.slug,
                    "no vault key configured; using credential as plaintext"
                );
                Ok(Credential::new(blob))
            }
        }
    }

    /// Handle → user id through the long-lived cache, falling back to lookup.
    async fn resolve_user_id(&self, ctx: &TenantContext) -> Result<String, PollError> {
        match self.store.get_user_id(&ctx.handle).await {
            Ok(Some(id)) => return Ok(id),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(tenant = %ctx.slug(), error = %e, "user id cache read failed");
            }
        }

        let id = self.session(ctx).lookup_user_id(&ctx.handle).await?;
        if let Err(e) = self.store.put_user_id(&ctx.handle, &id).await {
            tracing::warn!(tenant = %ctx.slug(), error = %e, "user id cache write failed");
        }
        tracing::debug!(
            tenant = %ctx.slug(),
            handle = %ctx.handle,
            user_id = %id,
            "resolved brand user id"
        );
        Ok(id)
    }

    /// The brand's recent posts, fetched at most once per tenant per cycle.
    pub(crate) async fn recent_posts(
        &self,
        ctx: &mut TenantContext,
    ) -> Result<Vec<PostId>, PollError> {
        if let Some(posts) = &ctx.recent_posts {
            return Ok(posts.clone());
        }
        let posts = self
            .session(ctx)
            .recent_posts(&ctx.brand_user_id, self.options.recent_post_limit)
            .await?;
        ctx.recent_posts = Some(posts.clone());
        Ok(posts)
    }
}
