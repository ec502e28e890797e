//! Engagement-type descriptor table.
//!
//! Each [`EngagementType`] maps to the tier it needs and how its candidates
//! are discovered: a recent-search query plus a local filter, or an actor
//! list fetched per brand post and diffed against the cached set.

use engage_core::{AccessTier, EngagementType, PostId};

use crate::client::ActorList;

/// Inputs available to the query builders for one tenant.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Handle without `@`.
    pub handle: &'a str,
    pub brand_user_id: &'a str,
    pub hashtags: &'a [String],
    /// Conversation roots of the brand's recent posts.
    pub conversation_ids: &'a [PostId],
}

/// Post-query filtering the search syntax cannot express precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    All,
    /// Keep only direct replies to the brand account.
    RepliesToBrand,
    /// Keep replies inside the brand's threads that answer someone else.
    ThreadRepliesNotToBrand,
}

impl ResultFilter {
    #[must_use]
    pub fn keeps(self, in_reply_to_user_id: Option<&str>, brand_user_id: &str) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::RepliesToBrand => in_reply_to_user_id == Some(brand_user_id),
            ResultFilter::ThreadRepliesNotToBrand => {
                in_reply_to_user_id.is_some_and(|id| id != brand_user_id)
            }
        }
    }
}

pub type QueryBuilder = fn(&QueryContext<'_>) -> Option<String>;

#[derive(Debug, Clone, Copy)]
pub enum Source {
    Search {
        build: QueryBuilder,
        filter: ResultFilter,
        /// `referenced_tweets` relation recorded as the original post.
        reference: Option<&'static str>,
        /// Whether the query is scoped to the brand's recent conversations.
        needs_conversations: bool,
    },
    Actors(ActorList),
}

#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub kind: EngagementType,
    pub tier: AccessTier,
    pub source: Source,
}

#[must_use]
pub fn descriptor(kind: EngagementType) -> Descriptor {
    let source = match kind {
        EngagementType::Mention => Source::Search {
            build: mention_query,
            filter: ResultFilter::All,
            reference: None,
            needs_conversations: false,
        },
        EngagementType::Reply => Source::Search {
            build: reply_query,
            filter: ResultFilter::RepliesToBrand,
            reference: Some("replied_to"),
            needs_conversations: false,
        },
        EngagementType::Quote => Source::Search {
            build: quote_query,
            filter: ResultFilter::All,
            reference: Some("quoted"),
            needs_conversations: false,
        },
        EngagementType::Hashtag => Source::Search {
            build: hashtag_query,
            filter: ResultFilter::All,
            reference: None,
            needs_conversations: false,
        },
        EngagementType::ThreadReply => Source::Search {
            build: thread_reply_query,
            filter: ResultFilter::ThreadRepliesNotToBrand,
            reference: Some("replied_to"),
            needs_conversations: true,
        },
        EngagementType::Like => Source::Actors(ActorList::Likers),
        EngagementType::Retweet => Source::Actors(ActorList::Retweeters),
    };

    Descriptor {
        kind,
        tier: kind.required_tier(),
        source,
    }
}

fn mention_query(ctx: &QueryContext<'_>) -> Option<String> {
    let h = ctx.handle;
    Some(format!("@{h} -from:{h} -is:retweet"))
}

fn reply_query(ctx: &QueryContext<'_>) -> Option<String> {
    let h = ctx.handle;
    Some(format!("to:{h} is:reply -from:{h}"))
}

fn quote_query(ctx: &QueryContext<'_>) -> Option<String> {
    let h = ctx.handle;
    Some(format!(
        "(url:\"twitter.com/{h}/status\" OR url:\"x.com/{h}/status\") is:quote -from:{h}"
    ))
}

fn hashtag_query(ctx: &QueryContext<'_>) -> Option<String> {
    if ctx.hashtags.is_empty() {
        return None;
    }
    let tags = ctx
        .hashtags
        .iter()
        .map(|t| format!("#{}", t.trim_start_matches('#')))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!("({tags}) -is:retweet -from:{}", ctx.handle))
}

fn thread_reply_query(ctx: &QueryContext<'_>) -> Option<String> {
    if ctx.conversation_ids.is_empty() {
        return None;
    }
    let conversations = ctx
        .conversation_ids
        .iter()
        .map(|id| format!("conversation_id:{id}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!("({conversations}) is:reply -from:{}", ctx.handle))
}
