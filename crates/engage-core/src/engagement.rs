use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::post_id::PostId;
use crate::tenant::Tenant;

/// Upstream authorization level. `Elevated` unlocks actor-list lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Basic,
    Elevated,
}

impl AccessTier {
    #[must_use]
    pub fn permits(self, required: AccessTier) -> bool {
        self >= required
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccessTier::Basic => "basic",
            AccessTier::Elevated => "elevated",
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AccessTier::Basic),
            "elevated" => Ok(AccessTier::Elevated),
            other => Err(format!("unknown access tier '{other}'")),
        }
    }
}

/// The engagement signals the poller knows how to discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngagementType {
    Mention,
    Reply,
    Like,
    Retweet,
    Quote,
    Hashtag,
    ThreadReply,
}

impl EngagementType {
    pub const ALL: [EngagementType; 7] = [
        EngagementType::Mention,
        EngagementType::Reply,
        EngagementType::Like,
        EngagementType::Retweet,
        EngagementType::Quote,
        EngagementType::Hashtag,
        EngagementType::ThreadReply,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementType::Mention => "mention",
            EngagementType::Reply => "reply",
            EngagementType::Like => "like",
            EngagementType::Retweet => "retweet",
            EngagementType::Quote => "quote",
            EngagementType::Hashtag => "hashtag",
            EngagementType::ThreadReply => "thread-reply",
        }
    }

    /// Minimum upstream tier needed to poll this type.
    #[must_use]
    pub fn required_tier(self) -> AccessTier {
        match self {
            EngagementType::Like | EngagementType::Retweet => AccessTier::Elevated,
            EngagementType::Mention
            | EngagementType::Reply
            | EngagementType::Quote
            | EngagementType::Hashtag
            | EngagementType::ThreadReply => AccessTier::Basic,
        }
    }
}

impl fmt::Display for EngagementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        EngagementType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown engagement type '{s}'"))
    }
}

/// One observed social action, built fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    /// Processed-marker key: the native post id, or `"{post}:{actor}"` for
    /// actions reconstructed from an actor list.
    pub key: String,
    /// Id that participates in cursor ordering.
    pub ordering_id: PostId,
    pub actor_id: String,
    pub text: Option<String>,
    pub original_post_id: Option<PostId>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Engagement {
    /// An engagement that is itself a post (mention, reply, quote, ...).
    #[must_use]
    pub fn from_post(
        id: PostId,
        actor_id: impl Into<String>,
        text: Option<String>,
        original_post_id: Option<PostId>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            key: id.to_string(),
            ordering_id: id,
            actor_id: actor_id.into(),
            text,
            original_post_id,
            occurred_at,
        }
    }

    /// An engagement synthesized from "who acted on this post" (like, retweet).
    #[must_use]
    pub fn from_actor(post_id: PostId, actor_id: impl Into<String>) -> Self {
        let actor_id = actor_id.into();
        Self {
            key: format!("{post_id}:{actor_id}"),
            ordering_id: post_id,
            actor_id,
            text: None,
            original_post_id: Some(post_id),
            occurred_at: None,
        }
    }
}

/// Result recorded alongside a processed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    Rewarded,
    Failed,
}

impl DispatchOutcome {
    #[must_use]
    pub fn from_success(success: bool) -> Self {
        if success {
            DispatchOutcome::Rewarded
        } else {
            DispatchOutcome::Failed
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Rewarded => "rewarded",
            DispatchOutcome::Failed => "failed",
        }
    }
}

impl FromStr for DispatchOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rewarded" => Ok(DispatchOutcome::Rewarded),
            "failed" => Ok(DispatchOutcome::Failed),
            other => Err(format!("unknown dispatch outcome '{other}'")),
        }
    }
}

/// Payload sent to the reward service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub brand_id: String,
    pub event_type: EngagementType,
    pub user_email: String,
    pub metadata: RewardMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardMetadata {
    pub tenant: String,
    pub engagement_id: String,
    pub actor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post_id: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RewardEvent {
    /// Builds the outbound payload. `observed_at` is used when the upstream
    /// did not report a creation time.
    #[must_use]
    pub fn new(
        tenant: &Tenant,
        engagement: &Engagement,
        kind: EngagementType,
        email_domain: &str,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            brand_id: tenant.brand_id.clone(),
            event_type: kind,
            user_email: synthetic_user_email(&engagement.actor_id, email_domain),
            metadata: RewardMetadata {
                tenant: tenant.slug.clone(),
                engagement_id: engagement.key.clone(),
                actor_id: engagement.actor_id.clone(),
                original_post_id: engagement.original_post_id,
                excerpt: engagement.text.clone(),
                timestamp: engagement.occurred_at.unwrap_or(observed_at),
            },
        }
    }
}

/// Deterministic stand-in identity for a social account in the reward service.
#[must_use]
pub fn synthetic_user_email(actor_id: &str, domain: &str) -> String {
    format!("x_{}@{}", actor_id.trim(), domain.trim().trim_start_matches('@'))
}
