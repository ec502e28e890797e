use std::sync::Arc;

use chrono::Utc;
use engage_core::{AppConfig, Engagement, EngagementType, RewardEvent, Tenant};

use crate::channel::{HttpChannel, RewardChannel};
use crate::error::DispatchError;

/// Sends reward events, preferring the internal channel and falling back to
/// the public one with the same payload.
pub struct RewardDispatcher {
    internal: Option<Arc<dyn RewardChannel>>,
    public: Arc<dyn RewardChannel>,
    email_domain: String,
}

impl RewardDispatcher {
    #[must_use]
    pub fn new(
        internal: Option<Arc<dyn RewardChannel>>,
        public: Arc<dyn RewardChannel>,
        email_domain: impl Into<String>,
    ) -> Self {
        Self {
            internal,
            public,
            email_domain: email_domain.into(),
        }
    }

    /// Builds HTTP channels from the reward settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if either endpoint URL is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, DispatchError> {
        let api_key = config.reward_api_key.as_deref();
        let internal = config
            .reward_internal_url
            .as_deref()
            .map(|url| {
                HttpChannel::new("internal", url, api_key, config.dispatch_timeout_secs)
                    .map(|c| Arc::new(c) as Arc<dyn RewardChannel>)
            })
            .transpose()?;
        let public = HttpChannel::new(
            "public",
            &config.reward_public_url,
            api_key,
            config.dispatch_timeout_secs,
        )?;

        Ok(Self::new(
            internal,
            Arc::new(public),
            config.synthetic_email_domain.clone(),
        ))
    }

    /// Builds the reward event for `engagement` and delivers it.
    ///
    /// Returns `true` only when one channel acknowledged the event. Failures
    /// are logged, never returned.
    pub async fn dispatch(
        &self,
        tenant: &Tenant,
        engagement: &Engagement,
        kind: EngagementType,
    ) -> bool {
        let event = RewardEvent::new(tenant, engagement, kind, &self.email_domain, Utc::now());
        self.deliver(&event).await
    }

    /// Delivers a prepared event over the channel chain.
    pub async fn deliver(&self, event: &RewardEvent) -> bool {
        if let Some(internal) = &self.internal {
            match internal.send(event).await {
                Ok(()) => {
                    log_delivered(internal.name(), event);
                    return true;
                }
                Err(e) => {
                    log_failure(internal.name(), event, &e, "falling back to public channel");
                }
            }
        }

        match self.public.send(event).await {
            Ok(()) => {
                log_delivered(self.public.name(), event);
                true
            }
            Err(e) => {
                log_failure(self.public.name(), event, &e, "reward dispatch failed");
                false
            }
        }
    }
}

fn log_delivered(channel: &str, event: &RewardEvent) {
    tracing::debug!(
        channel,
        tenant = %event.metadata.tenant,
        engagement_type = %event.event_type,
        engagement_id = %event.metadata.engagement_id,
        "reward event delivered"
    );
}

fn log_failure(channel: &str, event: &RewardEvent, error: &DispatchError, message: &str) {
    tracing::warn!(
        channel,
        tenant = %event.metadata.tenant,
        engagement_type = %event.event_type,
        engagement_id = %event.metadata.engagement_id,
        error = %error,
        "{message}"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use engage_core::{AccessTier, PostId};

    use super::*;

    struct FakeChannel {
        name: &'static str,
        succeed: bool,
        calls: AtomicUsize,
    }

    impl FakeChannel {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn as_channel(channel: &Arc<FakeChannel>) -> Arc<dyn RewardChannel> {
        channel.clone()
    }

    #[async_trait]
    impl RewardChannel for FakeChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _event: &RewardEvent) -> Result<(), DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(())
            } else {
                Err(DispatchError::Rejected {
                    channel: self.name.to_string(),
                    message: "down".to_string(),
                })
            }
        }
    }

    fn tenant() -> Tenant {
        Tenant {
            slug: "acme".to_string(),
            brand_id: "brand-acme".to_string(),
            handle: "acme".to_string(),
            active: true,
            encrypted_credential: "plain".to_string(),
            access_tier: AccessTier::Basic,
            hashtags: Vec::new(),
            configured_at: Utc::now(),
        }
    }

    fn mention() -> Engagement {
        Engagement::from_post(PostId::new(42), "7", Some("hi".to_string()), None, None)
    }

    #[tokio::test]
    async fn internal_success_skips_public() {
        let internal = FakeChannel::new("internal", true);
        let public = FakeChannel::new("public", true);
        let dispatcher =
            RewardDispatcher::new(Some(as_channel(&internal)), as_channel(&public), "d.invalid");

        assert!(dispatcher.dispatch(&tenant(), &mention(), EngagementType::Mention).await);
        assert_eq!(internal.calls(), 1);
        assert_eq!(public.calls(), 0);
    }

    #[tokio::test]
    async fn internal_failure_falls_back_to_public() {
        let internal = FakeChannel::new("internal", false);
        let public = FakeChannel::new("public", true);
        let dispatcher =
            RewardDispatcher::new(Some(as_channel(&internal)), as_channel(&public), "d.invalid");

        assert!(dispatcher.dispatch(&tenant(), &mention(), EngagementType::Mention).await);
        assert_eq!(internal.calls(), 1);
        assert_eq!(public.calls(), 1);
    }

    #[tokio::test]
    async fn both_channels_failing_returns_false() {
        let internal = FakeChannel::new("internal", false);
        let public = FakeChannel::new("public", false);
        let dispatcher =
            RewardDispatcher::new(Some(as_channel(&internal)), as_channel(&public), "d.invalid");

        assert!(!dispatcher.dispatch(&tenant(), &mention(), EngagementType::Reply).await);
        assert_eq!(public.calls(), 1);
    }

    #[tokio::test]
    async fn without_internal_channel_public_is_used_directly() {
        let public = FakeChannel::new("public", true);
        let dispatcher = RewardDispatcher::new(None, as_channel(&public), "d.invalid");

        assert!(dispatcher.dispatch(&tenant(), &mention(), EngagementType::Mention).await);
        assert_eq!(public.calls(), 1);
    }
}
