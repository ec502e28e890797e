//! Client for the X (Twitter) API v2 search and lookup endpoints.
//!
//! One [`UpstreamClient`] is shared by every tenant; per-tenant bearer tokens
//! are bound with [`UpstreamClient::session`]. Engagement-type specific query
//! construction lives in [`queries`].

pub mod client;
pub mod error;
pub mod queries;
pub mod types;

pub use client::{
    ActorDiff, ActorList, SearchBatch, UpstreamClient, UpstreamSession, MAX_ACTOR_PAGES,
    MAX_SEARCH_PAGES,
};
pub use error::UpstreamError;
pub use queries::{descriptor, Descriptor, QueryContext, ResultFilter, Source};
