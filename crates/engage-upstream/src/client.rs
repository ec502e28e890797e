//! HTTP client for the API v2 endpoints the poller needs.
//!
//! Status handling mirrors the engagement failure taxonomy: 403 becomes
//! [`UpstreamError::InsufficientAccessTier`], 429 becomes
//! [`UpstreamError::RateLimited`] carrying the reset time, and any other
//! non-2xx becomes [`UpstreamError::Status`]. Nothing here retries; a failed
//! call aborts the caller's sub-poll for this cycle.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engage_core::{Engagement, EngagementType, PostId};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;
use crate::queries::{descriptor, Descriptor, QueryContext, ResultFilter, Source};
use crate::types::{ApiPost, PostsResponse, UserLookupResponse, UsersResponse};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";

const POST_FIELDS: &str =
    "author_id,created_at,in_reply_to_user_id,conversation_id,referenced_tweets";

/// Upper bound on search pages followed in one poll.
pub const MAX_SEARCH_PAGES: usize = 5;

/// Upper bound on pages fetched when re-reading a post's actor list.
pub const MAX_ACTOR_PAGES: usize = 10;

/// Longest error body kept in [`UpstreamError::Status`].
const MAX_ERROR_BODY: usize = 300;

/// Actor lists that stand in for an event feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorList {
    Likers,
    Retweeters,
}

impl ActorList {
    fn path_segment(self) -> &'static str {
        match self {
            ActorList::Likers => "liking_users",
            ActorList::Retweeters => "retweeted_by",
        }
    }
}

/// Candidate engagements from one search, in upstream (newest-first) order.
#[derive(Debug, Default)]
pub struct SearchBatch {
    pub engagements: Vec<Engagement>,
    /// Newest id the upstream reported, including results dropped by the
    /// local filter.
    pub newest_id: Option<PostId>,
    /// More pages remained when the page budget ran out. Those older
    /// results are below the new cursor and will not be fetched again.
    pub page_budget_exhausted: bool,
}

/// Raw posts gathered across the pages of one recent search.
#[derive(Debug, Default)]
struct SearchPages {
    posts: Vec<ApiPost>,
    newest_id: Option<PostId>,
    page_budget_exhausted: bool,
}

/// Result of re-fetching a post's actor list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ActorDiff {
    /// Actors absent from the known set, in upstream order.
    pub new_actors: Vec<String>,
    /// Everything fetched this time; becomes the new cached set.
    pub current: BTreeSet<String>,
}

/// Shared HTTP client. Bind a tenant's token with [`UpstreamClient::session`].
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
    page_size: u32,
}

impl UpstreamClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64, page_size: u32) -> Result<Self, UpstreamError> {
        Self::with_base_url(timeout_secs, page_size, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`UpstreamError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        page_size: u32,
        base_url: &str,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent("engage-poller/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| UpstreamError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url,
            page_size: page_size.clamp(10, 100),
        })
    }

    #[must_use]
    pub fn session<'a>(&'a self, bearer_token: &'a str) -> UpstreamSession<'a> {
        UpstreamSession {
            client: self,
            bearer_token,
        }
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// A tenant-scoped view of the client.
pub struct UpstreamSession<'a> {
    client: &'a UpstreamClient,
    bearer_token: &'a str,
}

impl UpstreamSession<'_> {
    /// Resolves a handle to its stable numeric user id.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::UserNotFound`] when the API reports no such
    /// user, or any transport/status error.
    pub async fn lookup_user_id(&self, handle: &str) -> Result<String, UpstreamError> {
        let handle = handle.trim().trim_start_matches('@');
        let url = self
            .client
            .endpoint(&["2", "users", "by", "username", handle]);
        let response: UserLookupResponse = self.get_json(url, "users/by/username").await?;
        response
            .data
            .map(|u| u.id)
            .ok_or_else(|| UpstreamError::UserNotFound(handle.to_string()))
    }

    /// The brand's own most recent original posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns any transport/status/deserialization error.
    pub async fn recent_posts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PostId>, UpstreamError> {
        // The timeline endpoint accepts 5..=100.
        let max_results = limit.clamp(5, 100).to_string();
        let mut url = self.client.endpoint(&["2", "users", user_id, "tweets"]);
        url.query_pairs_mut()
            .append_pair("max_results", &max_results)
            .append_pair("exclude", "retweets,replies")
            .append_pair("tweet.fields", "created_at,conversation_id");

        let response: PostsResponse = self.get_json(url, "users/tweets").await?;
        Ok(response
            .data
            .iter()
            .filter_map(|p| parse_id(&p.id))
            .take(limit)
            .collect())
    }

    /// Runs a recent search, following `next_token` up to `max_pages`.
    /// Posts stay in upstream order; a failure on a later page discards
    /// earlier pages.
    async fn search_recent(
        &self,
        query: &str,
        since_id: Option<PostId>,
        max_pages: usize,
    ) -> Result<SearchPages, UpstreamError> {
        let page_size = self.client.page_size.to_string();
        let mut pages = SearchPages::default();
        let mut next_token: Option<String> = None;

        for page in 0..max_pages.max(1) {
            let mut url = self
                .client
                .endpoint(&["2", "tweets", "search", "recent"]);
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("query", query)
                    .append_pair("max_results", &page_size)
                    .append_pair("tweet.fields", POST_FIELDS);
                if let Some(since) = since_id {
                    pairs.append_pair("since_id", &since.to_string());
                }
                if let Some(token) = &next_token {
                    pairs.append_pair("next_token", token);
                }
            }

            let response: PostsResponse = self.get_json(url, "tweets/search/recent").await?;
            if page == 0 {
                pages.newest_id = response.meta.newest_id.as_deref().and_then(parse_id);
            }
            pages.posts.extend(response.data);

            match response.meta.next_token {
                Some(token) if page + 1 < max_pages => next_token = Some(token),
                Some(_) => {
                    tracing::warn!(
                        query,
                        max_pages,
                        "search results exceed page budget; older results left unfetched"
                    );
                    pages.page_budget_exhausted = true;
                    break;
                }
                None => break,
            }
        }

        Ok(pages)
    }

    /// Fetches one search-type engagement batch as described by `descriptor`.
    ///
    /// Returns an empty batch when the descriptor's query cannot be built
    /// (no hashtags configured, no recent conversations).
    ///
    /// # Errors
    ///
    /// Returns any transport/status/deserialization error. Actor-list
    /// descriptors yield an empty batch; use [`Self::list_actors`] for those.
    pub async fn search_engagements(
        &self,
        descriptor: &Descriptor,
        ctx: &QueryContext<'_>,
        since_id: Option<PostId>,
        max_pages: usize,
    ) -> Result<SearchBatch, UpstreamError> {
        let Source::Search {
            build,
            filter,
            reference,
            ..
        } = descriptor.source
        else {
            return Ok(SearchBatch::default());
        };
        let Some(query) = build(ctx) else {
            return Ok(SearchBatch::default());
        };

        let SearchPages {
            posts,
            newest_id: reported_newest,
            page_budget_exhausted,
        } = self.search_recent(&query, since_id, max_pages).await?;
        let newest_id = reported_newest.or_else(|| {
            PostId::newest(posts.iter().filter_map(|p| parse_id(&p.id)))
        });
        let engagements = to_engagements(&posts, filter, reference, ctx.brand_user_id);

        tracing::debug!(
            engagement_type = %descriptor.kind,
            fetched = posts.len(),
            kept = engagements.len(),
            "search batch fetched"
        );

        Ok(SearchBatch {
            engagements,
            newest_id,
            page_budget_exhausted,
        })
    }

    /// Mentions of `handle` newer than `cursor`.
    ///
    /// # Errors
    ///
    /// See [`Self::search_engagements`].
    pub async fn search_mentions(
        &self,
        handle: &str,
        cursor: Option<PostId>,
    ) -> Result<SearchBatch, UpstreamError> {
        let ctx = QueryContext {
            handle,
            brand_user_id: "",
            hashtags: &[],
            conversation_ids: &[],
        };
        let d = descriptor(EngagementType::Mention);
        self.search_engagements(&d, &ctx, cursor, MAX_SEARCH_PAGES)
            .await
    }

    /// Direct replies to the brand newer than `cursor`, filtered locally to
    /// those whose reply target is `brand_user_id`.
    ///
    /// # Errors
    ///
    /// See [`Self::search_engagements`].
    pub async fn search_replies(
        &self,
        handle: &str,
        brand_user_id: &str,
        cursor: Option<PostId>,
    ) -> Result<SearchBatch, UpstreamError> {
        let ctx = QueryContext {
            handle,
            brand_user_id,
            hashtags: &[],
            conversation_ids: &[],
        };
        let d = descriptor(EngagementType::Reply);
        self.search_engagements(&d, &ctx, cursor, MAX_SEARCH_PAGES)
            .await
    }

    /// Users who liked `post_id`, diffed against `known`.
    ///
    /// # Errors
    ///
    /// See [`Self::list_actors`].
    pub async fn list_likers(
        &self,
        post_id: PostId,
        known: &BTreeSet<String>,
    ) -> Result<ActorDiff, UpstreamError> {
        self.list_actors(ActorList::Likers, post_id, known).await
    }

    /// Users who retweeted `post_id`, diffed against `known`.
    ///
    /// # Errors
    ///
    /// See [`Self::list_actors`].
    pub async fn list_retweeters(
        &self,
        post_id: PostId,
        known: &BTreeSet<String>,
    ) -> Result<ActorDiff, UpstreamError> {
        self.list_actors(ActorList::Retweeters, post_id, known)
            .await
    }

    /// Re-fetches the full actor list for a post, following
    /// `pagination_token` up to [`MAX_ACTOR_PAGES`], and returns the set
    /// difference against the previously cached actors.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InsufficientAccessTier`] when the credential's
    /// plan excludes actor lookups, or any transport/status error. A failure
    /// on a later page discards earlier pages.
    pub async fn list_actors(
        &self,
        list: ActorList,
        post_id: PostId,
        known: &BTreeSet<String>,
    ) -> Result<ActorDiff, UpstreamError> {
        let post = post_id.to_string();
        let endpoint = format!("tweets/{}", list.path_segment());
        let page_size = self.client.page_size.to_string();
        let mut actors = Vec::new();
        let mut pagination_token: Option<String> = None;

        for page in 0..MAX_ACTOR_PAGES {
            let mut url = self
                .client
                .endpoint(&["2", "tweets", post.as_str(), list.path_segment()]);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("max_results", &page_size);
                if let Some(token) = &pagination_token {
                    pairs.append_pair("pagination_token", token);
                }
            }

            let response: UsersResponse = self.get_json(url, &endpoint).await?;
            actors.extend(response.data.into_iter().map(|u| u.id));

            match response.meta.next_token {
                Some(token) if page + 1 < MAX_ACTOR_PAGES => pagination_token = Some(token),
                Some(_) => {
                    tracing::warn!(
                        post_id = %post_id,
                        list = list.path_segment(),
                        fetched = actors.len(),
                        "actor list exceeds page budget; remaining actors left unfetched"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(diff_actors(actors, known))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        endpoint: &str,
    ) -> Result<T, UpstreamError> {
        let response = self
            .client
            .client
            .get(url)
            .bearer_auth(self.bearer_token)
            .send()
            .await?;
        let body = read_body(response, endpoint).await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
            context: endpoint.to_string(),
            source: e,
        })
    }
}

/// Maps status codes onto the error taxonomy and returns the body on 2xx.
async fn read_body(response: Response, endpoint: &str) -> Result<String, UpstreamError> {
    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        return Err(UpstreamError::InsufficientAccessTier {
            endpoint: endpoint.to_string(),
        });
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        return Err(UpstreamError::RateLimited { reset_at });
    }

    let body = response.text().await?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        });
    }
    Ok(body)
}

fn parse_id(raw: &str) -> Option<PostId> {
    match raw.parse::<PostId>() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, "skipping result with unparsable id");
            None
        }
    }
}

/// Converts raw posts into engagements, applying the local filter.
pub(crate) fn to_engagements(
    posts: &[ApiPost],
    filter: ResultFilter,
    reference: Option<&str>,
    brand_user_id: &str,
) -> Vec<Engagement> {
    posts
        .iter()
        .filter(|p| filter.keeps(p.in_reply_to_user_id.as_deref(), brand_user_id))
        .filter_map(|p| {
            let id = parse_id(&p.id)?;
            let Some(author) = p.author_id.clone() else {
                tracing::warn!(post_id = %id, "skipping result without author_id");
                return None;
            };
            let original = reference
                .and_then(|kind| p.referenced(kind))
                .and_then(parse_id);
            let text = (!p.text.is_empty()).then(|| p.text.clone());
            Some(Engagement::from_post(id, author, text, original, p.created_at))
        })
        .collect()
}

/// Order-preserving set difference of `fetched` against `known`.
pub(crate) fn diff_actors<I>(fetched: I, known: &BTreeSet<String>) -> ActorDiff
where
    I: IntoIterator<Item = String>,
{
    let mut diff = ActorDiff::default();
    for actor in fetched {
        if diff.current.insert(actor.clone()) && !known.contains(&actor) {
            diff.new_actors.push(actor);
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    fn post(id: &str, author: Option<&str>, reply_to: Option<&str>) -> ApiPost {
        ApiPost {
            id: id.to_string(),
            text: format!("post {id}"),
            author_id: author.map(str::to_string),
            created_at: None,
            in_reply_to_user_id: reply_to.map(str::to_string),
            conversation_id: None,
            referenced_tweets: Vec::new(),
        }
    }

    #[test]
    fn diff_returns_only_unseen_actors() {
        let known = set(&["1", "2", "3"]);
        let fetched = ["2", "3", "4", "5"].map(String::from);
        let diff = diff_actors(fetched, &known);
        assert_eq!(diff.new_actors, vec!["4", "5"]);
        assert_eq!(diff.current, set(&["2", "3", "4", "5"]));
    }

    #[test]
    fn diff_ignores_duplicate_actors_in_one_fetch() {
        let diff = diff_actors(["9", "9"].map(String::from), &BTreeSet::new());
        assert_eq!(diff.new_actors, vec!["9"]);
    }

    #[test]
    fn replies_are_filtered_to_brand_target() {
        let posts = vec![
            post("30", Some("a"), Some("100")),
            post("29", Some("b"), Some("200")),
            post("28", Some("c"), None),
        ];
        let kept = to_engagements(&posts, ResultFilter::RepliesToBrand, None, "100");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "30");
        assert_eq!(kept[0].actor_id, "a");
    }

    #[test]
    fn results_without_author_or_numeric_id_are_skipped() {
        let posts = vec![
            post("abc", Some("a"), None),
            post("31", None, None),
            post("32", Some("b"), None),
        ];
        let kept = to_engagements(&posts, ResultFilter::All, None, "100");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ordering_id, PostId::new(32));
    }

    #[test]
    fn endpoint_encodes_path_segments() {
        let client = UpstreamClient::with_base_url(5, 10, "http://localhost:9000/api").unwrap();
        let url = client.endpoint(&["2", "users", "by", "username", "a/b"]);
        assert_eq!(url.path(), "/api/2/users/by/username/a%2Fb");
    }

    #[test]
    fn page_size_is_clamped_to_api_bounds() {
        let client = UpstreamClient::with_base_url(5, 3, "http://localhost:9000").unwrap();
        assert_eq!(client.page_size, 10);
    }
}
