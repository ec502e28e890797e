use chrono::{DateTime, Utc};

use crate::engagement::{AccessTier, EngagementType};

/// One brand's isolated configuration within the deployment.
///
/// Read once per cycle and never mutated by the poller.
#[derive(Clone, PartialEq, Eq)]
pub struct Tenant {
    pub slug: String,
    /// Identifier the reward service knows the brand by.
    pub brand_id: String,
    /// Monitored handle, stored without a leading `@`.
    pub handle: String,
    pub active: bool,
    /// Credential as stored: an `enc:v1:` blob, or legacy plaintext.
    pub encrypted_credential: String,
    pub access_tier: AccessTier,
    pub hashtags: Vec<String>,
    pub configured_at: DateTime<Utc>,
}

impl Tenant {
    /// Engagement types this tenant's access tier allows, in polling order.
    #[must_use]
    pub fn supported_types(&self) -> Vec<EngagementType> {
        EngagementType::ALL
            .into_iter()
            .filter(|t| self.access_tier.permits(t.required_tier()))
            .collect()
    }
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("slug", &self.slug)
            .field("brand_id", &self.brand_id)
            .field("handle", &self.handle)
            .field("active", &self.active)
            .field("encrypted_credential", &"[redacted]")
            .field("access_tier", &self.access_tier)
            .field("hashtags", &self.hashtags)
            .field("configured_at", &self.configured_at)
            .finish()
    }
}

/// Strips a leading `@` and surrounding whitespace, lowercases.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_ascii_lowercase()
}
