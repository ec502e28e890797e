//! Result structures returned to whatever triggered the run.

use chrono::{DateTime, Utc};
use engage_core::{AccessTier, EngagementType, PostId};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of polling one engagement type for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResult {
    pub tenant: String,
    pub engagement_type: EngagementType,
    /// Candidates considered after first-run truncation.
    pub found: usize,
    pub rewarded: usize,
    pub failed: usize,
    pub already_processed: usize,
    pub first_run: bool,
    /// Cursor after this poll (proposed only, on dry runs).
    pub cursor: Option<PostId>,
    pub errors: Vec<String>,
}

impl PollResult {
    #[must_use]
    pub fn new(tenant: &str, engagement_type: EngagementType) -> Self {
        Self {
            tenant: tenant.to_string(),
            engagement_type,
            found: 0,
            rewarded: 0,
            failed: 0,
            already_processed: 0,
            first_run: false,
            cursor: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantReport {
    pub tenant: String,
    pub results: Vec<PollResult>,
    /// Failures that prevented any engagement type from running.
    pub errors: Vec<String>,
}

impl TenantReport {
    #[must_use]
    pub fn new(tenant: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Finds the result for one engagement type, if it ran.
    #[must_use]
    pub fn result(&self, kind: EngagementType) -> Option<&PollResult> {
        self.results.iter().find(|r| r.engagement_type == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub found: usize,
    pub rewarded: usize,
    pub failed: usize,
    pub already_processed: usize,
    pub errors: usize,
}

impl Totals {
    fn add(&mut self, report: &TenantReport) {
        self.errors += report.errors.len();
        for r in &report.results {
            self.found += r.found;
            self.rewarded += r.rewarded;
            self.failed += r.failed;
            self.already_processed += r.already_processed;
            self.errors += r.errors.len();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub tenants: Vec<TenantReport>,
    pub inactive_skipped: usize,
    pub totals: Totals,
}

impl CycleReport {
    pub(crate) fn finish(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        dry_run: bool,
        tenants: Vec<TenantReport>,
        inactive_skipped: usize,
    ) -> Self {
        let mut totals = Totals::default();
        for t in &tenants {
            totals.add(t);
        }
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run,
            tenants,
            inactive_skipped,
            totals,
        }
    }

    #[must_use]
    pub fn tenant(&self, slug: &str) -> Option<&TenantReport> {
        self.tenants.iter().find(|t| t.tenant == slug)
    }
}

/// Tenant configuration and cursors, without secrets.
#[derive(Debug, Clone, Serialize)]
pub struct TenantStatus {
    pub slug: String,
    pub brand_id: String,
    pub handle: String,
    pub active: bool,
    pub access_tier: AccessTier,
    pub hashtags: Vec<String>,
    pub credential_encrypted: bool,
    pub configured_at: DateTime<Utc>,
    pub cursors: Vec<CursorStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CursorStatus {
    pub engagement_type: EngagementType,
    pub cursor: Option<PostId>,
}
