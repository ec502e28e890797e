//! Shared fixtures: a mocked upstream, a mocked reward service and an
//! in-memory store wired into an [`Engine`].

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use engage_core::{AccessTier, MemoryStore, Tenant};
use engage_dispatch::{HttpChannel, RewardChannel, RewardDispatcher};
use engage_engine::{Engine, EngineOptions};
use engage_upstream::UpstreamClient;
use engage_vault::CredentialVault;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct Harness {
    pub upstream: MockServer,
    pub rewards: MockServer,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub async fn start(tenants: Vec<Tenant>) -> Self {
        Self {
            upstream: MockServer::start().await,
            rewards: MockServer::start().await,
            store: Arc::new(MemoryStore::with_tenants(tenants)),
        }
    }

    pub fn engine(&self, options: EngineOptions) -> Engine {
        self.engine_with(options, None, None)
    }

    pub fn engine_with(
        &self,
        options: EngineOptions,
        vault: Option<Arc<CredentialVault>>,
        internal_path: Option<&str>,
    ) -> Engine {
        let upstream = UpstreamClient::with_base_url(5, 10, &self.upstream.uri()).unwrap();
        let internal = internal_path.map(|p| -> Arc<dyn RewardChannel> {
            let url = format!("{}{p}", self.rewards.uri());
            Arc::new(HttpChannel::new("internal", &url, None, 5).unwrap())
        });
        let public_url = format!("{}/rewards", self.rewards.uri());
        let public: Arc<dyn RewardChannel> =
            Arc::new(HttpChannel::new("public", &public_url, None, 5).unwrap());
        let dispatcher = RewardDispatcher::new(internal, public, "x.engagement.invalid");
        Engine::new(self.store.clone(), vault, upstream, dispatcher, options)
    }

    /// Answers user lookups for `handle` with `user_id`.
    pub async fn user(&self, handle: &str, user_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/2/users/by/username/{handle}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": user_id, "username": handle }
            })))
            .mount(&self.upstream)
            .await;
    }

    /// Answers the brand timeline of `user_id` with `post_ids`.
    pub async fn timeline(&self, user_id: &str, post_ids: &[&str]) {
        let data: Vec<Value> = post_ids.iter().map(|id| json!({ "id": id })).collect();
        Mock::given(method("GET"))
            .and(path(format!("/2/users/{user_id}/tweets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .mount(&self.upstream)
            .await;
    }

    /// Reward service accepting every event.
    pub async fn accept_rewards(&self) {
        Mock::given(method("POST"))
            .and(path("/rewards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&self.rewards)
            .await;
    }

    /// Events the reward service received, in arrival order.
    pub async fn reward_events(&self) -> Vec<Value> {
        self.rewards
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

pub fn tenant(slug: &str, tier: AccessTier) -> Tenant {
    Tenant {
        slug: slug.to_string(),
        brand_id: format!("brand-{slug}"),
        handle: slug.to_string(),
        active: true,
        encrypted_credential: format!("token-{slug}"),
        access_tier: tier,
        hashtags: Vec::new(),
        configured_at: Utc::now(),
    }
}

/// A search post authored by `author`.
pub fn post(id: &str, author: &str) -> Value {
    json!({ "id": id, "text": format!("post {id}"), "author_id": author })
}

pub fn search_page(posts: &[Value], newest: Option<&str>) -> Value {
    let mut meta = json!({ "result_count": posts.len() });
    if let Some(n) = newest {
        meta["newest_id"] = json!(n);
    }
    json!({ "data": posts, "meta": meta })
}

pub fn mention_query(handle: &str) -> String {
    format!("@{handle} -from:{handle} -is:retweet")
}
