//! Bounded download pool: materializes work items into one destination directory
//!
//! Media items are streamed through at most `concurrency` download slots. Text items
//! need no network and are written up front without taking a slot. Every failure
//! stays at its item: it is logged, reported and the rest of the pool carries on.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::client::RemoteSource;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use crate::types::{CategoryReport, Event, ItemId, ItemKind, WorkItem};
use crate::utils::{any_exists, ensure_dir, partial_path, presence_names, write_atomic};

/// What happened to one item
#[derive(Debug)]
enum ItemOutcome {
    Downloaded(PathBuf),
    Skipped,
    Failed(String),
    Cancelled,
}

/// Deliver every item of `items` into `dest`, at most `concurrency` media at a time
///
/// The directory is created before the first write. Returns per-item counts; only
/// `downloaded`, `skipped`, `failed` and `cancelled` are filled in. Failed and
/// cancelled identities are dropped from the ledger again so the next run retries them.
pub async fn download_items(
    ctx: &RunContext,
    items: Vec<WorkItem>,
    dest: &Path,
    concurrency: usize,
) -> CategoryReport {
    let mut report = CategoryReport::default();
    if items.is_empty() {
        return report;
    }

    if let Err(e) = ensure_dir(dest).await {
        tracing::error!(
            account = %ctx.account,
            category = %ctx.category,
            dest = %dest.display(),
            error = %e,
            "Cannot create destination directory"
        );
        for item in items {
            record(ctx, &mut report, item.id, ItemOutcome::Failed(e.to_string()));
        }
        return report;
    }

    let (texts, media): (Vec<WorkItem>, Vec<WorkItem>) = items
        .into_iter()
        .partition(|item| matches!(item.kind, ItemKind::Text { .. }));

    for item in texts {
        let id = item.id.clone();
        let outcome = deliver(ctx, item, dest).await;
        record(ctx, &mut report, id, outcome);
    }

    let outcomes: Vec<(ItemId, ItemOutcome)> = stream::iter(media)
        .map(|item| async move {
            let id = item.id.clone();
            (id, deliver(ctx, item, dest).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (id, outcome) in outcomes {
        record(ctx, &mut report, id, outcome);
    }

    tracing::info!(
        account = %ctx.account,
        category = %ctx.category,
        dest = %dest.display(),
        downloaded = report.downloaded,
        skipped = report.skipped,
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "Download pool drained"
    );

    report
}

/// Write one item into `dest`, never returning an error past this boundary
async fn deliver(ctx: &RunContext, item: WorkItem, dest: &Path) -> ItemOutcome {
    if ctx.cancel.is_cancelled() {
        return ItemOutcome::Cancelled;
    }

    // Re-checked here: the harvester's view may be stale or it may have had no ledger
    if any_exists(dest, &presence_names(item.id.as_str(), &item.kind)).await {
        return ItemOutcome::Skipped;
    }

    let path = dest.join(item.file_name());
    let result = match &item.kind {
        ItemKind::Text { content } => write_atomic(&path, content.as_bytes()).await,
        ItemKind::Image { url } | ItemKind::Video { url } => {
            let source = &ctx.source;
            let path = path.as_path();
            fetch_with_retry(&ctx.retry, &ctx.cancel, || async move {
                stream_to_file(source.as_ref(), url, path).await
            })
            .await
        }
    };

    match result {
        Ok(()) => ItemOutcome::Downloaded(path),
        Err(_) if ctx.cancel.is_cancelled() => ItemOutcome::Cancelled,
        Err(e) => ItemOutcome::Failed(e.to_string()),
    }
}

/// Stream `url` into a `.part` sibling of `path`, then rename it into place
async fn stream_to_file(source: &dyn RemoteSource, url: &str, path: &Path) -> Result<()> {
    let partial = partial_path(path);
    let result = write_stream(source, url, &partial).await;
    match result {
        Ok(bytes) => {
            tokio::fs::rename(&partial, path)
                .await
                .map_err(|e| Error::filesystem(path, e))?;
            tracing::trace!(path = %path.display(), bytes, "Finalized download");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(
                    path = %partial.display(),
                    error = %cleanup,
                    "Failed to remove partial file"
                );
            }
            Err(e)
        }
    }
}

async fn write_stream(source: &dyn RemoteSource, url: &str, partial: &Path) -> Result<u64> {
    let mut body = source.open_stream(url).await?;
    let file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| Error::filesystem(partial, e))?;
    let mut writer = tokio::io::BufWriter::new(file);

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| Error::filesystem(partial, e))?;
        written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| Error::filesystem(partial, e))?;

    Ok(written)
}

fn record(ctx: &RunContext, report: &mut CategoryReport, id: ItemId, outcome: ItemOutcome) {
    match outcome {
        ItemOutcome::Downloaded(path) => {
            report.downloaded += 1;
            tracing::debug!(
                account = %ctx.account,
                category = %ctx.category,
                identity = %id,
                path = %path.display(),
                "Downloaded item"
            );
            ctx.emit(Event::ItemDownloaded {
                account: ctx.account.clone(),
                category: ctx.category,
                id,
                path,
            });
        }
        ItemOutcome::Skipped => {
            report.skipped += 1;
            tracing::debug!(
                account = %ctx.account,
                category = %ctx.category,
                identity = %id,
                "Already on disk"
            );
            ctx.emit(Event::ItemSkipped {
                account: ctx.account.clone(),
                category: ctx.category,
                id,
            });
        }
        ItemOutcome::Failed(error) => {
            tracing::warn!(
                account = %ctx.account,
                category = %ctx.category,
                identity = %id,
                error = %error,
                "Item download failed"
            );
            ctx.emit(Event::ItemFailed {
                account: ctx.account.clone(),
                category: ctx.category,
                id: id.clone(),
                error,
            });
            ctx.ledger.unmark(&ctx.account, ctx.category, &id);
            report.failed.push(id);
        }
        ItemOutcome::Cancelled => {
            ctx.ledger.unmark(&ctx.account, ctx.category, &id);
            report.cancelled += 1;
        }
    }
}
