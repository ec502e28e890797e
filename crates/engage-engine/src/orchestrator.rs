//! Tenant Orchestrator plus the manual entry points built on it.

use std::time::Instant;

use chrono::Utc;
use engage_core::{EngagementType, Tenant};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::PollError;
use crate::report::{CursorStatus, CycleReport, PollResult, TenantReport, TenantStatus};

impl Engine {
    /// Runs every supported engagement type for every active tenant, or for
    /// `only_tenant` when given.
    ///
    /// Per-tenant and per-type failures are recorded in the report.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Store`] if the tenant list cannot be read, or
    /// [`PollError::Configuration`] if `only_tenant` does not exist.
    pub async fn run_cycle(&self, only_tenant: Option<&str>) -> Result<CycleReport, PollError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let dry_run = self.options.dry_run;
        tracing::info!(%run_id, dry_run, tenant = ?only_tenant, "poll cycle starting");

        if !dry_run {
            match self.store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "purged expired markers and caches"),
                Err(e) => tracing::warn!(error = %e, "purge of expired markers failed"),
            }
        }

        let tenants = match only_tenant {
            Some(slug) => vec![self.require_tenant(slug).await?],
            None => self.store.list_tenants().await?,
        };
        let (active, inactive): (Vec<Tenant>, Vec<Tenant>) =
            tenants.into_iter().partition(|t| t.active);
        for t in &inactive {
            tracing::debug!(tenant = %t.slug, "skipping inactive tenant");
        }

        let max_concurrent = self.options.max_concurrent_tenants.max(1);
        let reports: Vec<TenantReport> = stream::iter(active)
            .map(|tenant| self.run_tenant(tenant))
            .buffered(max_concurrent)
            .collect()
            .await;

        let report = CycleReport::finish(run_id, started_at, dry_run, reports, inactive.len());
        tracing::info!(
            %run_id,
            tenants = report.tenants.len(),
            inactive_skipped = report.inactive_skipped,
            found = report.totals.found,
            rewarded = report.totals.rewarded,
            failed = report.totals.failed,
            errors = report.totals.errors,
            "poll cycle finished"
        );
        Ok(report)
    }

    /// All supported engagement types for one tenant, serialized so they
    /// share the credential's rate window.
    async fn run_tenant(&self, tenant: Tenant) -> TenantReport {
        let mut report = TenantReport::new(&tenant.slug);
        let deadline = Instant::now() + self.options.tenant_deadline;
        let kinds = tenant.supported_types();

        let mut ctx = match self.prepare(tenant).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(tenant = %report.tenant, error = %e, "tenant skipped");
                report.errors.push(e.to_string());
                return report;
            }
        };

        for kind in kinds {
            if Instant::now() >= deadline {
                tracing::warn!(
                    tenant = %report.tenant,
                    engagement_type = %kind,
                    "tenant deadline exceeded; skipping remaining engagement types"
                );
                report
                    .errors
                    .push(format!("{kind}: skipped, tenant deadline exceeded"));
                continue;
            }
            report.results.push(self.poll_prepared(&mut ctx, kind).await);
        }
        report
    }

    /// Manual trigger for one engagement type of one tenant.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] when the tenant is unknown or inactive, or its
    /// credential or user id cannot be resolved. Failures inside the poll
    /// itself are reported in the returned [`PollResult`].
    pub async fn poll_one(
        &self,
        slug: &str,
        kind: EngagementType,
    ) -> Result<PollResult, PollError> {
        let tenant = self.require_tenant(slug).await?;
        if !tenant.active {
            return Err(PollError::config(format!("tenant '{slug}' is inactive")));
        }
        let mut ctx = self.prepare(tenant).await?;
        Ok(self.poll_prepared(&mut ctx, kind).await)
    }

    /// Clears one cursor so the next poll is a first run. Returns whether a
    /// cursor existed.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] if the tenant is unknown or the store fails.
    pub async fn reset_cursor(&self, slug: &str, kind: EngagementType) -> Result<bool, PollError> {
        self.require_tenant(slug).await?;
        let existed = self.store.clear_cursor(slug, kind).await?;
        tracing::info!(tenant = slug, engagement_type = %kind, existed, "cursor reset");
        Ok(existed)
    }

    /// Tenant configuration and cursor positions.
    ///
    /// # Errors
    ///
    /// Returns [`PollError`] if the tenant is unknown or the store fails.
    pub async fn status(
        &self,
        only_tenant: Option<&str>,
    ) -> Result<Vec<TenantStatus>, PollError> {
        let tenants = match only_tenant {
            Some(slug) => vec![self.require_tenant(slug).await?],
            None => self.store.list_tenants().await?,
        };

        let mut statuses = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let mut cursors = Vec::new();
            for kind in EngagementType::ALL {
                let cursor = self.store.get_cursor(&tenant.slug, kind).await?;
                cursors.push(CursorStatus {
                    engagement_type: kind,
                    cursor,
                });
            }
            statuses.push(TenantStatus {
                credential_encrypted: engage_vault::is_sealed(&tenant.encrypted_credential),
                slug: tenant.slug,
                brand_id: tenant.brand_id,
                handle: tenant.handle,
                active: tenant.active,
                access_tier: tenant.access_tier,
                hashtags: tenant.hashtags,
                configured_at: tenant.configured_at,
                cursors,
            });
        }
        Ok(statuses)
    }

    async fn require_tenant(&self, slug: &str) -> Result<Tenant, PollError> {
        self.store
            .get_tenant(slug)
            .await?
            .ok_or_else(|| PollError::config(format!("tenant '{slug}' not found")))
    }
}
