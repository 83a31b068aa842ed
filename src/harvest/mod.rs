//! Striped concurrent pagination over a listing endpoint.
//!
//! With `W` workers, stripe `k` (0-based) requests pages `k+1, k+1+W, k+1+2W, …`
//! until it receives an empty page. There is no shared cursor: the remote listing
//! is partitioned between stripes purely by page number modulo `W`, so the total
//! item count never needs to be known up front.
//!
//! Every record on a fetched page goes through [`admit`]: the ledger is checked and
//! marked in one critical section, then the destination directory is checked for an
//! existing file. Stripes accumulate into their own vectors; the orchestrator merges
//! them once every stripe has stopped.

use std::collections::HashSet;
use std::path::Path;

use futures::stream::{self, StreamExt};

use crate::client::records::MediaRecord;
use crate::client::{Listing, page_records};
use crate::config::HarvestConfig;
use crate::context::RunContext;
use crate::retry::fetch_with_retry;
use crate::types::{Event, StripeFailure, WorkItem};
use crate::utils::{any_exists, presence_names};

/// Everything a harvest produced, ready for the download stage
#[derive(Debug, Default)]
pub struct HarvestOutcome {
    /// New items, free of duplicates, in no particular order
    pub items: Vec<WorkItem>,
    /// Records dropped because the ledger or the destination already had them
    pub skipped: usize,
    /// Records that could not be turned into work items
    pub malformed: usize,
    /// Non-empty pages fetched across all stripes
    pub pages_fetched: usize,
    /// Stripes that gave up before reaching their empty page
    pub stripe_failures: Vec<StripeFailure>,
    /// At least one stripe stopped because the run was cancelled
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct StripeResult {
    items: Vec<WorkItem>,
    skipped: usize,
    malformed: usize,
    pages: usize,
    failure: Option<StripeFailure>,
    cancelled: bool,
}

/// Sweep `listing` with `config.workers` concurrent stripes
///
/// Items are admitted against the ledger in `ctx` and the files already in `dest`.
/// A stripe that keeps failing is recorded in the outcome; its siblings carry on.
pub async fn harvest(
    ctx: &RunContext,
    listing: &Listing,
    dest: &Path,
    config: &HarvestConfig,
) -> HarvestOutcome {
    let workers = config.workers.max(1);
    let page_size = config.page_size.max(1);

    ctx.emit(Event::HarvestStarted {
        account: ctx.account.clone(),
        category: ctx.category,
    });
    tracing::debug!(
        account = %ctx.account,
        category = %ctx.category,
        url = %listing.url,
        workers,
        page_size,
        "Starting striped harvest"
    );

    let results: Vec<StripeResult> = stream::iter(0..workers)
        .map(|stripe| run_stripe(ctx, listing, dest, stripe, workers, page_size))
        .buffer_unordered(workers)
        .collect()
        .await;

    let outcome = merge_stripes(results);

    ctx.emit(Event::HarvestComplete {
        account: ctx.account.clone(),
        category: ctx.category,
        queued: outcome.items.len(),
        skipped: outcome.skipped,
    });
    tracing::info!(
        account = %ctx.account,
        category = %ctx.category,
        queued = outcome.items.len(),
        skipped = outcome.skipped,
        malformed = outcome.malformed,
        pages = outcome.pages_fetched,
        failed_stripes = outcome.stripe_failures.len(),
        "Harvest complete"
    );

    outcome
}

async fn run_stripe(
    ctx: &RunContext,
    listing: &Listing,
    dest: &Path,
    stripe: usize,
    workers: usize,
    page_size: usize,
) -> StripeResult {
    let mut result = StripeResult::default();
    let mut page = stripe + 1;

    loop {
        if ctx.cancel.is_cancelled() {
            tracing::debug!(
                account = %ctx.account,
                category = %ctx.category,
                stripe,
                page,
                "Stripe cancelled"
            );
            result.cancelled = true;
            break;
        }

        let query = listing.page_query(page, page_size);
        let source = &ctx.source;
        let query = &query;
        let fetched = fetch_with_retry(&ctx.retry, &ctx.cancel, || async move {
            source
                .fetch_json(&listing.url, query)
                .await
                .and_then(|body| page_records(listing, body))
        })
        .await;

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                if ctx.cancel.is_cancelled() {
                    result.cancelled = true;
                    break;
                }
                tracing::error!(
                    account = %ctx.account,
                    category = %ctx.category,
                    stripe,
                    page,
                    error = %e,
                    "Giving up on stripe"
                );
                let failure = StripeFailure {
                    stripe,
                    page,
                    error: e.to_string(),
                };
                ctx.emit(Event::StripeFailed {
                    account: ctx.account.clone(),
                    category: ctx.category,
                    failure: failure.clone(),
                });
                result.failure = Some(failure);
                break;
            }
        };

        // Only an empty page ends a stripe; a short one may still be followed by more
        if records.is_empty() {
            tracing::debug!(
                account = %ctx.account,
                category = %ctx.category,
                stripe,
                page,
                "Reached empty page"
            );
            break;
        }

        result.pages += 1;
        ctx.emit(Event::PageFetched {
            account: ctx.account.clone(),
            category: ctx.category,
            page,
            items: records.len(),
        });

        for record in records {
            let item = match MediaRecord::parse(record, &listing.url)
                .and_then(|record| record.into_work_item(&listing.url))
            {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(
                        account = %ctx.account,
                        category = %ctx.category,
                        page,
                        error = %e,
                        "Skipping malformed record"
                    );
                    result.malformed += 1;
                    continue;
                }
            };

            if admit(ctx, dest, &item).await {
                result.items.push(item);
            } else {
                result.skipped += 1;
            }
        }

        page += workers;
    }

    result
}

/// Decide whether `item` still needs downloading into `dest`
///
/// The ledger check-and-mark runs first and always records the identity, so an item
/// seen here is in the ledger afterwards even if its file already exists.
pub(crate) async fn admit(ctx: &RunContext, dest: &Path, item: &WorkItem) -> bool {
    if ctx.ledger.check_and_mark(&ctx.account, ctx.category, &item.id) {
        tracing::debug!(
            account = %ctx.account,
            category = %ctx.category,
            identity = %item.id,
            "Already in ledger"
        );
        return false;
    }
    if any_exists(dest, &presence_names(item.id.as_str(), &item.kind)).await {
        tracing::debug!(
            account = %ctx.account,
            category = %ctx.category,
            identity = %item.id,
            "Already on disk"
        );
        return false;
    }
    ctx.emit(Event::ItemQueued {
        account: ctx.account.clone(),
        category: ctx.category,
        id: item.id.clone(),
    });
    true
}

/// Concatenate stripe results, dropping identities listed more than once
fn merge_stripes(results: Vec<StripeResult>) -> HarvestOutcome {
    let mut outcome = HarvestOutcome::default();
    let mut seen = HashSet::new();

    for result in results {
        for item in result.items {
            if seen.insert(item.id.clone()) {
                outcome.items.push(item);
            } else {
                outcome.skipped += 1;
            }
        }
        outcome.skipped += result.skipped;
        outcome.malformed += result.malformed;
        outcome.pages_fetched += result.pages;
        outcome.stripe_failures.extend(result.failure);
        outcome.cancelled |= result.cancelled;
    }

    outcome.stripe_failures.sort_by_key(|f| f.stripe);
    outcome
}
