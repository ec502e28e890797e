//! Engagement Poller: one tenant, one engagement type.
//!
//! Order of operations per poll:
//!
//! 1. read the cursor (absent means first run)
//! 2. fetch candidates newer than the cursor, newest first
//! 3. on a first run keep only the [`FIRST_RUN_LIMIT`] newest candidates
//! 4. skip candidates with a processed marker, dispatch the rest, and mark
//!    each one with its outcome whether or not dispatch succeeded
//! 5. store refreshed actor sets, then advance the cursor
//!
//! The cursor only moves after every candidate has been attempted, so a crash
//! mid-batch re-fetches the unattempted tail next cycle and the markers stop
//! the attempted head from being rewarded twice.

use std::collections::BTreeSet;

use engage_core::{DispatchOutcome, Engagement, EngagementType, PostId, FIRST_RUN_LIMIT};
use engage_upstream::{descriptor, QueryContext, Source, MAX_SEARCH_PAGES};

use crate::engine::{Engine, TenantContext};
use crate::error::PollError;
use crate::report::PollResult;

/// Candidates for one poll plus what is needed to advance state afterwards.
#[derive(Debug, Default)]
struct Candidates {
    engagements: Vec<Engagement>,
    /// Newest id the source reported, including results filtered out locally.
    newest_id: Option<PostId>,
    /// Refreshed actor sets to cache once the batch has been attempted.
    actor_sets: Vec<(PostId, BTreeSet<String>)>,
    /// Search results ran past the page budget.
    page_budget_exhausted: bool,
}

impl Engine {
    /// Polls one engagement type for an already prepared tenant.
    ///
    /// Errors are folded into the returned result; they never escape.
    pub(crate) async fn poll_prepared(
        &self,
        ctx: &mut TenantContext,
        kind: EngagementType,
    ) -> PollResult {
        let mut result = PollResult::new(ctx.slug(), kind);

        let required = kind.required_tier();
        if !ctx.tenant.access_tier.permits(required) {
            result.errors.push(format!(
                "{kind} requires {required} API access; upgrade the tenant's access tier to enable it"
            ));
            return result;
        }

        if let Err(e) = self.poll_inner(ctx, kind, &mut result).await {
            tracing::warn!(
                tenant = %ctx.slug(),
                engagement_type = %kind,
                error = %e,
                "engagement poll failed"
            );
            result.errors.push(e.to_string());
        }
        result
    }

    async fn poll_inner(
        &self,
        ctx: &mut TenantContext,
        kind: EngagementType,
        result: &mut PollResult,
    ) -> Result<(), PollError> {
        let cursor = self.store.get_cursor(ctx.slug(), kind).await?;
        result.first_run = cursor.is_none();
        result.cursor = cursor;

        let Candidates {
            mut engagements,
            newest_id,
            actor_sets,
            page_budget_exhausted,
        } = self.fetch_candidates(ctx, kind, cursor).await?;

        // The cursor still moves to the newest id, so anything older than the
        // last fetched page is skipped for good.
        if let (true, Some(since)) = (page_budget_exhausted, cursor) {
            result.errors.push(format!(
                "{kind}: more than {MAX_SEARCH_PAGES} pages of new results; \
                 older engagements after cursor {since} were skipped"
            ));
        }

        let truncated = result.first_run && engagements.len() > FIRST_RUN_LIMIT;
        if truncated {
            tracing::info!(
                tenant = %ctx.slug(),
                engagement_type = %kind,
                fetched = engagements.len(),
                kept = FIRST_RUN_LIMIT,
                "first run; processing only the newest engagements"
            );
            engagements.truncate(FIRST_RUN_LIMIT);
        }
        result.found = engagements.len();

        let batch_newest = PostId::newest(engagements.iter().map(|e| e.ordering_id));
        let proposed = if truncated {
            batch_newest
        } else {
            batch_newest.max(newest_id)
        };
        let advance_to = proposed.filter(|p| cursor.is_none_or(|c| *p > c));

        if self.options.dry_run {
            for engagement in &engagements {
                if self.store.is_processed(ctx.slug(), kind, &engagement.key).await? {
                    result.already_processed += 1;
                }
            }
            result.cursor = advance_to.or(cursor);
            return Ok(());
        }

        self.dispatch_batch(ctx, kind, &engagements, result).await?;

        for (post_id, actors) in &actor_sets {
            if let Err(e) = self
                .store
                .put_actor_set(ctx.slug(), kind, *post_id, actors)
                .await
            {
                tracing::warn!(
                    tenant = %ctx.slug(),
                    engagement_type = %kind,
                    post_id = %post_id,
                    error = %e,
                    "failed to cache actor set"
                );
                result
                    .errors
                    .push(format!("failed to cache actors for post {post_id}: {e}"));
            }
        }

        if let Some(next) = advance_to {
            self.store.set_cursor(ctx.slug(), kind, next).await?;
            result.cursor = Some(next);
        }

        tracing::info!(
            tenant = %ctx.slug(),
            engagement_type = %kind,
            found = result.found,
            rewarded = result.rewarded,
            failed = result.failed,
            already_processed = result.already_processed,
            cursor = ?result.cursor,
            "engagement poll complete"
        );
        Ok(())
    }

    /// Dispatches every unmarked engagement in upstream order and marks it.
    async fn dispatch_batch(
        &self,
        ctx: &TenantContext,
        kind: EngagementType,
        engagements: &[Engagement],
        result: &mut PollResult,
    ) -> Result<(), PollError> {
        for engagement in engagements {
            if self
                .store
                .is_processed(ctx.slug(), kind, &engagement.key)
                .await?
            {
                result.already_processed += 1;
                continue;
            }

            let delivered = self.dispatcher.dispatch(&ctx.tenant, engagement, kind).await;
            if delivered {
                result.rewarded += 1;
            } else {
                result.failed += 1;
            }

            let outcome = DispatchOutcome::from_success(delivered);
            if let Err(e) = self
                .store
                .mark_processed(ctx.slug(), kind, &engagement.key, outcome)
                .await
            {
                tracing::error!(
                    tenant = %ctx.slug(),
                    engagement_type = %kind,
                    engagement_id = %engagement.key,
                    error = %e,
                    "failed to record processed marker"
                );
                result
                    .errors
                    .push(format!("failed to mark {} processed: {e}", engagement.key));
            }
        }
        Ok(())
    }

    async fn fetch_candidates(
        &self,
        ctx: &mut TenantContext,
        kind: EngagementType,
        cursor: Option<PostId>,
    ) -> Result<Candidates, PollError> {
        let descriptor = descriptor(kind);
        match descriptor.source {
            Source::Search {
                needs_conversations,
                ..
            } => {
                if kind == EngagementType::Hashtag && ctx.tenant.hashtags.is_empty() {
                    return Err(PollError::config(format!(
                        "tenant '{}' has no hashtags configured",
                        ctx.slug()
                    )));
                }
                let conversations = if needs_conversations {
                    self.recent_posts(ctx).await?
                } else {
                    Vec::new()
                };
                let query = QueryContext {
                    handle: &ctx.handle,
                    brand_user_id: &ctx.brand_user_id,
                    hashtags: &ctx.tenant.hashtags,
                    conversation_ids: &conversations,
                };
                // A first run only ever keeps a handful; one page is enough.
                let pages = if cursor.is_none() { 1 } else { MAX_SEARCH_PAGES };
                let batch = self
                    .session(ctx)
                    .search_engagements(&descriptor, &query, cursor, pages)
                    .await?;
                Ok(Candidates {
                    engagements: batch.engagements,
                    newest_id: batch.newest_id,
                    actor_sets: Vec::new(),
                    page_budget_exhausted: batch.page_budget_exhausted,
                })
            }
            Source::Actors(list) => {
                let posts = self.recent_posts(ctx).await?;
                let mut candidates = Candidates {
                    newest_id: PostId::newest(posts.iter().copied()),
                    ..Candidates::default()
                };
                for post_id in posts {
                    let known = self
                        .store
                        .get_actor_set(ctx.slug(), kind, post_id)
                        .await?
                        .unwrap_or_default();
                    let diff = self
                        .session(ctx)
                        .list_actors(list, post_id, &known)
                        .await?;
                    candidates.engagements.extend(
                        diff.new_actors
                            .into_iter()
                            .map(|actor| Engagement::from_actor(post_id, actor)),
                    );
                    candidates.actor_sets.push((post_id, diff.current));
                }
                Ok(candidates)
            }
        }
    }
}
