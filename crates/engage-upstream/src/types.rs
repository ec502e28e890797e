//! Wire shapes for the subset of API v2 responses the client reads.
//!
//! Unknown fields are ignored; every collection defaults to empty because the
//! API omits `data` entirely when nothing matched.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserLookupResponse {
    pub data: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferencedPost {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPost {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub author_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub in_reply_to_user_id: Option<String>,
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Vec<ReferencedPost>,
}

impl ApiPost {
    /// Id of the referenced post of the given relation (`quoted`, `replied_to`).
    #[must_use]
    pub fn referenced(&self, kind: &str) -> Option<&str> {
        self.referenced_tweets
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.id.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    pub newest_id: Option<String>,
    pub oldest_id: Option<String>,
    #[serde(default)]
    pub result_count: u32,
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostsResponse {
    #[serde(default)]
    pub data: Vec<ApiPost>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub data: Vec<ApiUser>,
    #[serde(default)]
    pub meta: PageMeta,
}
