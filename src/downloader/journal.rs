//! Journal pipeline.
//!
//! Phase 1 fetches every article in one bulk call and expands the article bodies
//! concurrently into work items, each admitted against `journal/{permalink}/`.
//! Phase 2 walks the articles one at a time and runs the download pool inside each
//! article directory, which is only created once it has something to hold.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};

use crate::client::records::ArticleRecord;
use crate::client::page_records;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::harvest::admit;
use crate::pool::download_items;
use crate::retry::fetch_with_retry;
use crate::types::{Account, Category, CategoryReport, Event, WorkItem};
use crate::utils::{ensure_dir, safe_path_component};

use super::VscoDownloader;

/// Work items of one article, admitted and ready for its directory
#[derive(Debug, Default)]
struct ArticleWork {
    dir: PathBuf,
    items: Vec<WorkItem>,
    skipped: usize,
    malformed: usize,
}

impl VscoDownloader {
    /// Mirror every journal article into `journal/{permalink}/`
    ///
    /// # Errors
    ///
    /// A failure of the bulk article listing aborts the category, since there is
    /// nothing to partition around it. Failures inside one article stay in that article.
    pub async fn download_journal(&self, account: &Account) -> Result<CategoryReport> {
        let root = self.category_dir(account, Category::Journal)?;
        ensure_dir(&root).await?;

        let ctx = self.context(account, Category::Journal);
        ctx.emit(Event::HarvestStarted {
            account: ctx.account.clone(),
            category: ctx.category,
        });

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let listing = self.endpoints(account).journal();
        let query = listing.page_query(1, self.config.harvest.journal_page_size);
        let page = fetch_with_retry(&ctx.retry, &ctx.cancel, || {
            ctx.source.fetch_json(&listing.url, &query)
        })
        .await?;
        let records = page_records(&listing, page)?;
        ctx.emit(Event::PageFetched {
            account: ctx.account.clone(),
            category: ctx.category,
            page: 1,
            items: records.len(),
        });

        let mut report = CategoryReport::default();
        let mut articles = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<ArticleRecord>(record) {
                Ok(article) => articles.push(article),
                Err(e) => {
                    tracing::warn!(
                        account = %ctx.account,
                        error = %e,
                        "Skipping malformed journal article"
                    );
                    report.malformed += 1;
                }
            }
        }

        let works: Vec<ArticleWork> = stream::iter(articles)
            .map(|article| expand_article(&ctx, &root, article))
            .buffered(self.config.harvest.workers.max(1))
            .collect()
            .await;

        let queued: usize = works.iter().map(|work| work.items.len()).sum();
        let skipped: usize = works.iter().map(|work| work.skipped).sum();
        ctx.emit(Event::HarvestComplete {
            account: ctx.account.clone(),
            category: ctx.category,
            queued,
            skipped,
        });
        tracing::info!(
            account = %ctx.account,
            articles = works.len(),
            queued,
            skipped,
            "Journal listing complete"
        );

        for work in works {
            report.skipped += work.skipped;
            report.malformed += work.malformed;
            let article = download_items(
                &ctx,
                work.items,
                &work.dir,
                self.config.download.max_concurrent_downloads,
            )
            .await;
            report.merge(article);
        }

        Ok(self.finish(&ctx, report))
    }
}

async fn expand_article(ctx: &RunContext, root: &Path, article: ArticleRecord) -> ArticleWork {
    let Some(permalink) = safe_path_component(&article.permalink) else {
        tracing::warn!(
            account = %ctx.account,
            permalink = %article.permalink,
            "Skipping journal article with unusable permalink"
        );
        return ArticleWork {
            malformed: 1,
            ..ArticleWork::default()
        };
    };

    let mut work = ArticleWork {
        dir: root.join(permalink),
        ..ArticleWork::default()
    };
    // Repeated ids within one article map to one file
    let mut listed = HashSet::new();
    for block in article.body {
        match block.into_work_item(permalink) {
            Ok(Some(item)) => {
                if !listed.insert(item.id.clone()) {
                    tracing::debug!(
                        account = %ctx.account,
                        permalink,
                        identity = %item.id,
                        "Repeated block in article"
                    );
                    work.skipped += 1;
                } else if admit(ctx, &work.dir, &item).await {
                    work.items.push(item);
                } else {
                    work.skipped += 1;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    account = %ctx.account,
                    permalink,
                    error = %e,
                    "Skipping malformed journal block"
                );
                work.malformed += 1;
            }
        }
    }
    work
}
